//! Per-page structural text extraction through lopdf.

use async_trait::async_trait;
use docgrid_core::{Error, ExtractionUnit, Result};
use tracing::debug;

use super::{normalize_whitespace, ExtractionBackend, ExtractionInput};
use crate::pdf;
use crate::policy::BackendKind;

#[derive(Debug, Default)]
pub struct StructuredBackend;

impl StructuredBackend {
    pub fn new() -> Self {
        Self
    }
}

fn structured_pages(bytes: &[u8]) -> Result<Vec<ExtractionUnit>> {
    let doc = pdf::load(bytes)?;
    let pages = pdf::pages(&doc);
    let total = pages.len();
    let units: Vec<ExtractionUnit> = pages
        .into_iter()
        .filter_map(|(page_no, _)| {
            let text = normalize_whitespace(&pdf::page_text(&doc, page_no));
            (!text.is_empty()).then(|| ExtractionUnit::new(page_no as usize, text))
        })
        .collect();
    debug!("lopdf: {} of {} pages carry text", units.len(), total);
    Ok(units)
}

#[async_trait]
impl ExtractionBackend for StructuredBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Structured
    }

    fn supports(&self, extension: &str) -> bool {
        extension == "pdf"
    }

    async fn extract(&self, input: &ExtractionInput) -> Result<Vec<ExtractionUnit>> {
        let bytes = input.bytes.clone();
        tokio::task::spawn_blocking(move || structured_pages(&bytes))
            .await
            .map_err(|e| Error::Extraction(format!("lopdf task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testpdf::{build, Page};
    use docgrid_core::Document;
    use std::sync::Arc;

    fn input(bytes: Vec<u8>) -> ExtractionInput {
        ExtractionInput::new(Document::new("doc1", "doc.pdf", bytes.len(), None), Arc::new(bytes))
    }

    #[tokio::test]
    async fn test_text_pages() {
        let bytes = build(&[Page::Text("Alpha page"), Page::Image, Page::Text("Gamma page")]);
        let units = StructuredBackend::new().extract(&input(bytes)).await.unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].page, 1);
        assert!(units[0].text.contains("Alpha"));
        assert_eq!(units[1].page, 3);
    }

    #[tokio::test]
    async fn test_image_only_is_empty() {
        let units = StructuredBackend::new()
            .extract(&input(build(&[Page::Image, Page::Image])))
            .await
            .unwrap();
        assert!(units.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_is_error() {
        let result = StructuredBackend::new()
            .extract(&input(b"not a pdf".to_vec()))
            .await;
        assert!(result.is_err());
    }
}
