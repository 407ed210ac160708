//! Model-assisted extraction: page images are transcribed by a vision model and
//! merged with whatever text layer the page has.

use std::sync::Arc;

use async_trait::async_trait;
use docgrid_core::{ConcurrencyLimiter, Error, ExtractionUnit, Result, TaskRegistry};
use docgrid_llm::{TaskContext, VisionModel};
use tracing::{debug, warn};

use super::{normalize_whitespace, ExtractionBackend, ExtractionInput};
use crate::pdf::{self, EmbeddedImage};
use crate::policy::BackendKind;

/// Pages examined per document. Vision calls are slow and billed per image.
pub const DEFAULT_MAX_PAGES: usize = 50;

struct PageWork {
    page: u32,
    text: String,
    images: Vec<EmbeddedImage>,
}

/// Each vision call holds a limiter permit and a registered, cancellable task.
pub struct ModelAssistedBackend {
    vision: Arc<dyn VisionModel>,
    limiter: ConcurrencyLimiter,
    tasks: Arc<TaskRegistry>,
    max_pages: usize,
}

impl ModelAssistedBackend {
    pub fn new(
        vision: Arc<dyn VisionModel>,
        limiter: ConcurrencyLimiter,
        tasks: Arc<TaskRegistry>,
    ) -> Self {
        Self {
            vision,
            limiter,
            tasks,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    async fn transcribe(&self, image: &EmbeddedImage, page: u32) -> Result<Option<String>> {
        let _permit = self.limiter.acquire().await?;
        let tracked = self.tasks.track();
        let task = TaskContext::new(tracked.id.clone(), tracked.token.clone());
        debug!("{} transcribing image on page {}", task.task_id, page);

        tokio::select! {
            biased;
            _ = tracked.token.cancelled() => Err(Error::Cancelled(task.task_id.clone())),
            result = self.vision.transcribe_image(&image.bytes, image.mime, &task) => result,
        }
    }
}

fn collect_pages(bytes: &[u8], max_pages: usize) -> Result<Vec<PageWork>> {
    let doc = pdf::load(bytes)?;
    Ok(pdf::pages(&doc)
        .into_iter()
        .take(max_pages)
        .map(|(page, id)| PageWork {
            page,
            text: normalize_whitespace(&pdf::page_text(&doc, page)),
            images: pdf::page_images(&doc, id),
        })
        .collect())
}

#[async_trait]
impl ExtractionBackend for ModelAssistedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::ModelAssisted
    }

    fn supports(&self, extension: &str) -> bool {
        extension == "pdf"
    }

    async fn extract(&self, input: &ExtractionInput) -> Result<Vec<ExtractionUnit>> {
        let bytes = input.bytes.clone();
        let max_pages = self.max_pages;
        let pages = tokio::task::spawn_blocking(move || collect_pages(&bytes, max_pages))
            .await
            .map_err(|e| Error::Extraction(format!("lopdf task failed: {}", e)))??;

        let mut units = Vec::new();
        let mut last_error = None;
        for work in pages {
            let mut parts = Vec::new();
            if !work.text.is_empty() {
                parts.push(work.text);
            }
            for image in &work.images {
                match self.transcribe(image, work.page).await {
                    Ok(Some(text)) if !text.trim().is_empty() => parts.push(text.trim().to_string()),
                    Ok(_) => debug!("Vision model saw no text on page {}", work.page),
                    Err(Error::Cancelled(id)) => {
                        warn!("Vision transcription {} cancelled on page {}", id, work.page);
                        return Err(Error::Cancelled(id));
                    }
                    Err(e) => {
                        warn!("Vision transcription failed on page {}: {}", work.page, e);
                        last_error = Some(e);
                    }
                }
            }
            if !parts.is_empty() {
                units.push(ExtractionUnit::new(work.page as usize, parts.join("\n\n")));
            }
        }

        match (units.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(units),
        }
    }
}
