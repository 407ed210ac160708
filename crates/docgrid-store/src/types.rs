//! Records exchanged with the vector store.

use docgrid_core::{Chunk, UnitMetadata};
use serde::{Deserialize, Serialize};

/// A chunk ready for indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedRecord {
    /// `<document_id>_<chunk_number>`, stable across re-uploads.
    pub id: String,
    pub document_id: String,
    pub chunk_number: usize,
    pub page: usize,
    pub text: String,
    pub metadata: UnitMetadata,
}

impl PreparedRecord {
    pub fn from_chunk(document_id: &str, chunk: &Chunk) -> Self {
        Self {
            id: format!("{}_{}", document_id, chunk.chunk_number),
            document_id: document_id.to_string(),
            chunk_number: chunk.chunk_number,
            page: chunk.page,
            text: chunk.text.clone(),
            metadata: chunk.metadata.clone(),
        }
    }
}

/// A chunk as returned by retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub content: String,
    pub page: usize,
    #[serde(default)]
    pub chunk_number: usize,
}

/// Result of a vector or hybrid search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub chunks: Vec<RetrievedChunk>,
    /// Keywords used for the keyword half of a hybrid search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

/// Result of a decomposed search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecomposedSearch {
    pub sub_queries: Vec<String>,
    pub chunks: Vec<RetrievedChunk>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertStatus {
    pub upserted: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteStatus {
    pub document_id: String,
    pub deleted: usize,
}
