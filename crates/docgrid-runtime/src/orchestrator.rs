//! DocGrid facade: coordinates upload, extraction, storage and queries.

use std::path::PathBuf;
use std::sync::Arc;

use docgrid_core::{
    extension_of, ConcurrencyLimiter, DocGridConfig, Document, Error, Result, TaskRegistry,
};
use docgrid_ingest::{
    content_key, BackendRegistry, DocumentPipeline, ExtractionBackend, ProcessedDocument,
};
use docgrid_llm::{CompletionService, VisionModel};
use docgrid_query::{QueryExecutor, QueryRequest, QueryResult};
use docgrid_store::{DeleteStatus, RetrievedChunk, VectorStore};
use tracing::{debug, error, info, warn};

use crate::types::*;

/// Top-level entry point.
pub struct DocGrid {
    config: DocGridConfig,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn CompletionService>,
    pipeline: DocumentPipeline,
    executor: Arc<QueryExecutor>,
    registry: Arc<TaskRegistry>,
    limiter: ConcurrencyLimiter,
}

impl DocGrid {
    /// Wire everything up. Fails only on misconfiguration.
    ///
    /// `extra_backends` are registered after the built-in ones and replace
    /// any built-in backend of the same kind (this is how a cloud OCR backend
    /// gets in).
    pub fn new(
        config: DocGridConfig,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn CompletionService>,
        vision: Option<Arc<dyn VisionModel>>,
        extra_backends: Vec<Arc<dyn ExtractionBackend>>,
    ) -> Result<Self> {
        if config.query.max_concurrency == 0 {
            return Err(Error::Config("max_concurrency must be at least 1".into()));
        }

        let limiter = ConcurrencyLimiter::new(config.query.max_concurrency);
        let registry = Arc::new(TaskRegistry::new());

        let mut backends = BackendRegistry::with_defaults(vision, limiter.clone(), registry.clone());
        for backend in extra_backends {
            backends.register(backend);
        }
        let pipeline = DocumentPipeline::new(&config.extraction, limiter.clone(), backends)?;
        let executor = Arc::new(QueryExecutor::new(
            store.clone(),
            llm.clone(),
            limiter.clone(),
            registry.clone(),
            &config.query,
        ));

        info!(
            "DocGrid initialized: loader={}, max_concurrency={}, uploads={}",
            config.extraction.loader,
            config.query.max_concurrency,
            config.data_paths.uploads.display()
        );

        Ok(Self {
            config,
            store,
            llm,
            pipeline,
            executor,
            registry,
            limiter,
        })
    }

    pub fn config(&self) -> &DocGridConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &DocumentPipeline {
        &self.pipeline
    }

    pub fn executor(&self) -> &Arc<QueryExecutor> {
        &self.executor
    }

    /// Persist, extract, chunk and index an uploaded file.
    ///
    /// Returns the new document id, or `None` when anything other than
    /// configuration went wrong (already logged).
    pub async fn upload_and_process(&self, filename: &str, bytes: Vec<u8>) -> Result<Option<String>> {
        let id = uuid::Uuid::new_v4().simple().to_string();

        let path = match self.persist(&id, filename, &bytes).await {
            Ok(path) => path,
            Err(e) => {
                error!("Failed to persist {}: {}", filename, e);
                return Ok(None);
            }
        };
        let document = Document::new(&id, filename, bytes.len(), Some(path))
            .with_content_hash(content_key(&bytes));

        let processed = match self.pipeline.process(&document, Arc::new(bytes)).await {
            Ok(p) => p,
            Err(Error::Config(msg)) => return Err(Error::Config(msg)),
            Err(e) => {
                error!("Failed to process {}: {}", filename, e);
                return Ok(None);
            }
        };

        match self.index(&id, &processed).await {
            Ok(upserted) => {
                info!(
                    "Indexed {} as {} ({} chunks, cached={})",
                    filename, id, upserted, processed.load.from_cache
                );
                Ok(Some(id))
            }
            Err(Error::Config(msg)) => Err(Error::Config(msg)),
            Err(e) => {
                error!("Failed to index {}: {}", filename, e);
                Ok(None)
            }
        }
    }

    async fn persist(&self, id: &str, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let extension = extension_of(filename);
        let stored = if extension.is_empty() {
            id.to_string()
        } else {
            format!("{}.{}", id, extension)
        };
        let path = self.config.data_paths.uploads.join(stored);
        tokio::fs::write(&path, bytes).await?;
        debug!("Persisted {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    async fn index(&self, id: &str, processed: &ProcessedDocument) -> Result<usize> {
        let records = self.store.prepare_chunks(id, &processed.chunks).await?;
        Ok(self.store.upsert(records).await?.upserted)
    }

    pub async fn delete_document(&self, id: &str) -> Result<DeleteStatus> {
        let status = self.store.delete_document(id).await?;
        info!("Deleted document {} ({} records)", id, status.deleted);
        Ok(status)
    }

    pub async fn get_chunks(&self, id: &str) -> Result<Vec<RetrievedChunk>> {
        self.store.get_chunks(id).await
    }

    /// Run one query on its own task. A panic anywhere below yields the fallback.
    pub async fn run_query(&self, request: &QueryRequest) -> QueryResult {
        self.executor.run_isolated(request.clone()).await
    }

    pub async fn run_batch(&self, requests: Vec<QueryRequest>) -> Vec<QueryResult> {
        self.executor.run_batch(requests).await
    }

    /// Cancel in-flight work. Returns how many tasks were cancelled, counting
    /// both the registry and calls the completion service tracks itself.
    pub fn cancel(&self, target: CancelTarget) -> usize {
        let cancelled = match &target {
            CancelTarget::Task(id) => {
                usize::from(self.registry.cancel(id)) + usize::from(self.llm.cancel_task(id))
            }
            CancelTarget::All => self.registry.cancel_all() + self.llm.cancel_all(),
        };
        if cancelled == 0 {
            warn!("Nothing to cancel for {:?}", target);
        } else {
            info!("Cancelled {} task(s) for {:?}", cancelled, target);
        }
        cancelled
    }

    pub fn status(&self) -> RuntimeStatus {
        RuntimeStatus {
            active_tasks: self.registry.len(),
            cache_entries: self.pipeline.cache().len(),
            max_concurrency: self.limiter.limit(),
            peak_concurrency: self.limiter.peak(),
        }
    }
}
