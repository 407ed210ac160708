//! Extraction backends.
//!
//! Each backend turns document bytes into page units. The cascade runner drives
//! them in the order the strategy policy chooses; backends know nothing about
//! classification or about each other.

pub mod fast_text;
#[cfg(feature = "pdf-inspect")]
pub mod model_assisted;
#[cfg(feature = "pdf-inspect")]
pub mod structured;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use docgrid_core::{ConcurrencyLimiter, Document, ExtractionUnit, Result, TaskRegistry};
use docgrid_llm::VisionModel;

use crate::policy::BackendKind;

/// What a backend gets to work with.
#[derive(Debug, Clone)]
pub struct ExtractionInput {
    pub document: Document,
    pub bytes: Arc<Vec<u8>>,
}

impl ExtractionInput {
    pub fn new(document: Document, bytes: Arc<Vec<u8>>) -> Self {
        Self { document, bytes }
    }
}

/// One way of getting text out of a document.
///
/// Returning `Ok(vec![])` means the backend ran but found nothing; the cascade
/// then moves on exactly as it would for an error.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Whether the backend can read files with this extension.
    fn supports(&self, extension: &str) -> bool;

    async fn extract(&self, input: &ExtractionInput) -> Result<Vec<ExtractionUnit>>;
}

/// Backends available to the cascade, keyed by kind.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<BackendKind, Arc<dyn ExtractionBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in backends. Model-assisted extraction is only registered when a
    /// vision model is supplied; its calls share `limiter` and `tasks` with the
    /// rest of the system.
    pub fn with_defaults(
        vision: Option<Arc<dyn VisionModel>>,
        limiter: ConcurrencyLimiter,
        tasks: Arc<TaskRegistry>,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(fast_text::FastTextBackend::new()));
        #[cfg(feature = "pdf-inspect")]
        {
            registry.register(Arc::new(structured::StructuredBackend::new()));
            if let Some(vision) = vision {
                registry.register(Arc::new(model_assisted::ModelAssistedBackend::new(
                    vision, limiter, tasks,
                )));
            }
        }
        #[cfg(not(feature = "pdf-inspect"))]
        let _ = (vision, limiter, tasks);
        registry
    }

    /// Add or replace the backend for its kind.
    pub fn register(&mut self, backend: Arc<dyn ExtractionBackend>) {
        self.backends.insert(backend.kind(), backend);
    }

    pub fn get(&self, kind: BackendKind) -> Option<Arc<dyn ExtractionBackend>> {
        self.backends.get(&kind).cloned()
    }

    pub fn contains(&self, kind: BackendKind) -> bool {
        self.backends.contains_key(&kind)
    }

    pub fn kinds(&self) -> Vec<BackendKind> {
        self.backends.keys().copied().collect()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.kinds())
            .finish()
    }
}

/// Collapse whitespace inside lines and squeeze blank-line runs to one.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut pending_blank = false;
    for raw in text.lines() {
        let line = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            pending_blank = !lines.is_empty();
            continue;
        }
        if pending_blank {
            lines.push(String::new());
            pending_blank = false;
        }
        lines.push(line);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_vision() {
        let registry = BackendRegistry::with_defaults(
            None,
            ConcurrencyLimiter::new(1),
            Arc::new(TaskRegistry::new()),
        );
        assert!(registry.contains(BackendKind::FastText));
        assert!(!registry.contains(BackendKind::ModelAssisted));
        assert!(!registry.contains(BackendKind::CloudOcr));
        #[cfg(feature = "pdf-inspect")]
        assert!(registry.contains(BackendKind::Structured));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("  Hello    world \n\n\n\n  next   line  "),
            "Hello world\n\nnext line"
        );
        assert_eq!(normalize_whitespace(" \n \t "), "");
    }
}
