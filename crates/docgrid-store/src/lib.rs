//! DocGrid Store: the vector-store collaborator interface.
//!
//! The pipeline and query engine only see [`VectorStore`]. Concrete vector
//! databases live outside this workspace; [`MemoryVectorStore`] backs tests
//! and the command-line tool.

pub mod memory;
pub mod types;

use async_trait::async_trait;
use docgrid_core::{Chunk, Result, Rule};

pub use memory::MemoryVectorStore;
pub use types::*;

/// Abstract vector store.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`prepare_chunks`](VectorStore::prepare_chunks) | Turn chunks into indexable records |
/// | [`upsert`](VectorStore::upsert) | Insert or replace records |
/// | [`vector_search`](VectorStore::vector_search) | Similarity search for one or more queries |
/// | [`hybrid_search`](VectorStore::hybrid_search) | Keyword + similarity search |
/// | [`decomposed_search`](VectorStore::decomposed_search) | Search per sub-question and merge |
/// | [`get_chunks`](VectorStore::get_chunks) | All chunks of a document, in order |
/// | [`delete_document`](VectorStore::delete_document) | Drop a document's records |
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn prepare_chunks(&self, document_id: &str, chunks: &[Chunk])
        -> Result<Vec<PreparedRecord>>;

    async fn upsert(&self, records: Vec<PreparedRecord>) -> Result<UpsertStatus>;

    async fn vector_search(&self, queries: &[String], document_id: &str) -> Result<SearchResponse>;

    async fn hybrid_search(
        &self,
        query: &str,
        document_id: &str,
        rules: &[Rule],
    ) -> Result<SearchResponse>;

    async fn decomposed_search(
        &self,
        query: &str,
        document_id: &str,
        rules: &[Rule],
    ) -> Result<DecomposedSearch>;

    async fn get_chunks(&self, document_id: &str) -> Result<Vec<RetrievedChunk>>;

    async fn delete_document(&self, document_id: &str) -> Result<DeleteStatus>;
}
