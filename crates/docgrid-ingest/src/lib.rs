//! DocGrid Ingest: content classification, cascading extraction, content cache and chunking.
//!
//! Bytes flow through [`DocumentPipeline`]: the classifier labels the content,
//! the strategy policy orders the backends, the cascade runs them through the
//! content cache, and the chunker produces numbered chunks.

pub mod backends;
pub mod cache;
pub mod cascade;
pub mod chunking;
pub mod classify;
pub mod file;
#[cfg(feature = "pdf-inspect")]
pub mod pdf;
pub mod pipeline;
pub mod policy;

#[cfg(test)]
mod testpdf;

pub use backends::{BackendRegistry, ExtractionBackend, ExtractionInput};
pub use cache::{content_key, ContentCache};
pub use cascade::{AttemptState, CascadeOutcome, CascadeRunner, QualityGate, ALL_FAILED_TEXT};
pub use chunking::{DocumentChunker, RecursiveChunker};
pub use classify::ContentClassifier;
pub use pipeline::{DocumentPipeline, LoadOutcome, ProcessedDocument};
pub use policy::{BackendKind, FileKind, StrategyPolicy};
