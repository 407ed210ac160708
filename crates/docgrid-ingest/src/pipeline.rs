//! Document pipeline: classify, select strategies, run the cascade through the
//! content cache, then chunk.

use std::sync::Arc;

use docgrid_core::{
    Chunk, Classification, ConcurrencyLimiter, Document, Error, ExtractionSettings,
    ExtractionUnit, Result,
};
use tracing::{debug, info, warn};

use crate::backends::{BackendRegistry, ExtractionInput};
use crate::cache::{content_key, ContentCache};
use crate::cascade::{AttemptState, CascadeRunner, QualityGate};
use crate::chunking::{DocumentChunker, RecursiveChunker};
use crate::classify::ContentClassifier;
use crate::policy::{BackendKind, StrategyPolicy};

/// What loading a document produced.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// `None` when the units came from the cache without classification.
    pub classification: Option<Classification>,
    pub units: Vec<ExtractionUnit>,
    /// Backend whose output was used; `None` when every backend failed.
    pub method: Option<String>,
    pub from_cache: bool,
    pub attempts: Vec<(BackendKind, AttemptState)>,
}

#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub load: LoadOutcome,
    pub chunks: Vec<Chunk>,
}

pub struct DocumentPipeline {
    classifier: ContentClassifier,
    policy: StrategyPolicy,
    cascade: CascadeRunner,
    cache: Arc<ContentCache>,
    chunker: DocumentChunker,
}

impl DocumentPipeline {
    /// Build the pipeline. Fails with `Error::Config` when the configured loader
    /// is unknown or unregistered, or when OCR is enabled without an OCR backend.
    pub fn new(
        settings: &ExtractionSettings,
        limiter: ConcurrencyLimiter,
        registry: BackendRegistry,
    ) -> Result<Self> {
        let primary: BackendKind = settings.loader.parse()?;
        if !registry.contains(primary) {
            return Err(Error::Config(format!(
                "loader {} has no registered backend",
                primary
            )));
        }
        let ocr_enabled = settings.ocr_enabled();
        if ocr_enabled && !registry.contains(BackendKind::CloudOcr) {
            return Err(Error::Config(
                "OCR credential is set but no cloud_ocr backend is registered".into(),
            ));
        }

        let policy = StrategyPolicy::default_for(primary, ocr_enabled);
        for kind in policy.backends() {
            if !registry.contains(kind) {
                warn!("Backend {} is in the strategy table but not registered", kind);
            }
        }

        Ok(Self {
            classifier: ContentClassifier::new(settings.large_document_bytes),
            policy,
            cascade: CascadeRunner::new(registry),
            cache: Arc::new(ContentCache::new(
                settings.cache_capacity,
                settings.cache_ttl(),
            )),
            chunker: DocumentChunker::new(
                RecursiveChunker::new(settings.chunk_size, settings.chunk_overlap),
                limiter,
            ),
        })
    }

    pub fn with_policy(mut self, policy: StrategyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_quality_gate(mut self, gate: QualityGate) -> Self {
        self.cascade = self.cascade.with_gate(gate);
        self
    }

    pub fn policy(&self) -> &StrategyPolicy {
        &self.policy
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Classify a document without extracting it.
    pub async fn classify(&self, document: &Document, bytes: Arc<Vec<u8>>) -> Classification {
        let classifier = self.classifier.clone();
        let extension = document.extension.clone();
        tokio::task::spawn_blocking(move || classifier.classify(&bytes, &extension))
            .await
            .unwrap_or(Classification::Unknown)
    }

    /// Extract a document's units, consulting the cache first. Never fails; a
    /// total failure yields one error unit.
    pub async fn load(&self, document: &Document, bytes: Arc<Vec<u8>>) -> LoadOutcome {
        let key = if document.content_hash.is_empty() {
            content_key(&bytes)
        } else {
            document.content_hash.clone()
        };

        if let Some(mut units) = self.cache.get(&key) {
            debug!("Content cache hit for {}", document.filename);
            for unit in &mut units {
                unit.metadata.source = document.id.clone();
            }
            let method = units.first().map(|u| u.metadata.extraction_method.clone());
            return LoadOutcome {
                classification: None,
                units,
                method,
                from_cache: true,
                attempts: Vec::new(),
            };
        }

        let classification = self.classify(document, bytes.clone()).await;
        let order = self.policy.select(&document.extension, classification);
        info!(
            "{} classified as {}, trying {}",
            document.filename,
            classification,
            order
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        let input = ExtractionInput::new(document.clone(), bytes);
        let outcome = self.cascade.run(&input, &order).await;
        if outcome.succeeded() {
            self.cache.put(key, outcome.units.clone());
        }

        LoadOutcome {
            classification: Some(classification),
            method: outcome.method.map(|k| k.as_str().to_string()),
            units: outcome.units,
            from_cache: false,
            attempts: outcome.attempts,
        }
    }

    /// Load then chunk. Chunks carry `file_path` when the document was persisted.
    pub async fn process(&self, document: &Document, bytes: Arc<Vec<u8>>) -> Result<ProcessedDocument> {
        let load = self.load(document, bytes).await;
        let mut chunks = self.chunker.chunk_units(load.units.clone()).await?;

        if let Some(path) = &document.path {
            let path = serde_json::Value::String(path.display().to_string());
            for chunk in &mut chunks {
                chunk.metadata.extra.insert("file_path".into(), path.clone());
            }
        }
        info!(
            "Processed {} into {} chunks ({})",
            document.filename,
            chunks.len(),
            load.method.as_deref().unwrap_or("no method")
        );
        Ok(ProcessedDocument { load, chunks })
    }
}
