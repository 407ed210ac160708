//! Configuration and data directory management.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Paths to the DocGrid data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Persisted upload bytes (`data/uploads/`).
    pub uploads: PathBuf,
    /// LLM configuration (`data/llm-config.json`).
    pub llm_config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            uploads: root.join("uploads"),
            llm_config_file: root.join("llm-config.json"),
            root,
        };
        std::fs::create_dir_all(&paths.uploads)?;
        Ok(paths)
    }
}

/// Extraction pipeline knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSettings {
    /// Primary backend for non-PDF files.
    pub loader: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
    /// PDFs above this size are treated as scanned without inspection.
    pub large_document_bytes: usize,
    /// Credential for the cloud OCR backend. Enables it in the strategy table.
    #[serde(skip_serializing, default)]
    pub ocr_api_key: Option<String>,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            loader: "fast_text".into(),
            chunk_size: 512,
            chunk_overlap: 64,
            cache_ttl_secs: 1800,
            cache_capacity: 100,
            large_document_bytes: 10_000_000,
            ocr_api_key: None,
        }
    }
}

impl ExtractionSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn ocr_enabled(&self) -> bool {
        self.ocr_api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// Query engine knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySettings {
    /// Upper bound on concurrently outstanding upstream calls.
    pub max_concurrency: usize,
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    /// Fraction of the delay randomly added or removed.
    pub backoff_jitter: f64,
    pub max_backoff_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            max_retries: 3,
            initial_backoff_ms: 1000,
            backoff_multiplier: 2.0,
            backoff_jitter: 0.1,
            max_backoff_ms: 30_000,
            request_timeout_secs: 60,
        }
    }
}

impl QuerySettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Top-level DocGrid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocGridConfig {
    pub data_paths: DataPaths,
    pub extraction: ExtractionSettings,
    pub query: QuerySettings,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl DocGridConfig {
    /// Configuration with defaults only, rooted at `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self {
            data_paths: DataPaths::new(data_dir)?,
            extraction: ExtractionSettings::default(),
            query: QuerySettings::default(),
        })
    }

    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let mut config = Self::new(data_dir)?;

        let ex = &mut config.extraction;
        ex.loader = std::env::var("DOCGRID_LOADER").unwrap_or_else(|_| ex.loader.clone());
        ex.chunk_size = env_or("DOCGRID_CHUNK_SIZE", ex.chunk_size);
        ex.chunk_overlap = env_or("DOCGRID_CHUNK_OVERLAP", ex.chunk_overlap);
        ex.cache_ttl_secs = env_or("DOCGRID_CACHE_TTL_SECS", ex.cache_ttl_secs);
        ex.cache_capacity = env_or("DOCGRID_CACHE_CAPACITY", ex.cache_capacity);
        ex.large_document_bytes = env_or("DOCGRID_LARGE_DOCUMENT_BYTES", ex.large_document_bytes);
        ex.ocr_api_key = std::env::var("DOCGRID_OCR_API_KEY").ok();

        let q = &mut config.query;
        q.max_concurrency = env_or("DOCGRID_MAX_CONCURRENCY", q.max_concurrency);
        q.max_retries = env_or("DOCGRID_MAX_RETRIES", q.max_retries);
        q.initial_backoff_ms = env_or("DOCGRID_INITIAL_BACKOFF_MS", q.initial_backoff_ms);
        q.request_timeout_secs = env_or("DOCGRID_REQUEST_TIMEOUT_SECS", q.request_timeout_secs);

        Ok(config)
    }
}
