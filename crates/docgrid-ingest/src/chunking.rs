//! Text chunking.
//!
//! A recursive character splitter cuts each unit into retrieval-sized chunks with
//! a separator-aligned overlap. Units are split in parallel batches on the
//! blocking pool, gated by the shared concurrency limiter.

use std::sync::Arc;

use docgrid_core::{Chunk, ConcurrencyLimiter, Error, ExtractionUnit, Result, UnitMetadata};
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub const DEFAULT_CHUNK_SIZE: usize = 512;
pub const DEFAULT_CHUNK_OVERLAP: usize = 64;

pub const NO_CONTENT_TEXT: &str = "No content could be extracted from this document.";
pub const NO_CONTENT_ERROR: &str = "Content extraction failed";
pub const NO_CHUNKS_TEXT: &str =
    "Document was processed but no meaningful chunks could be extracted.";
pub const NO_CHUNKS_ERROR: &str = "Chunking failed";

/// Recursive chunker that respects document structure.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    separators: Vec<&'static str>,
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl RecursiveChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size / 2),
            separators: vec!["\n\n", "\n", ". ", " ", ""],
        }
    }

    /// Split `text` into chunks of at most `chunk_size` characters. Every chunk
    /// after the first opens with a tail of its predecessor.
    pub fn split(&self, text: &str) -> Vec<String> {
        // Leave room for the overlap prefix and its joining space.
        let body_size = (self.chunk_size - self.chunk_overlap).max(1);
        let bodies: Vec<String> = self
            .split_text(text, &self.separators, body_size)
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        if self.chunk_overlap == 0 {
            return bodies;
        }

        let mut out = Vec::with_capacity(bodies.len());
        for (idx, body) in bodies.iter().enumerate() {
            if idx == 0 {
                out.push(body.clone());
                continue;
            }
            let tail = overlap_tail(&bodies[idx - 1], self.chunk_overlap.saturating_sub(1));
            if tail.is_empty() {
                out.push(body.clone());
            } else {
                out.push(format!("{} {}", tail, body));
            }
        }
        out
    }

    fn split_text(&self, text: &str, separators: &[&'static str], size: usize) -> Vec<String> {
        if text.chars().count() <= size {
            return vec![text.to_string()];
        }

        // First separator present in the text; "" always matches.
        let pos = separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(pos).copied().unwrap_or("");
        let remaining = separators.get(pos + 1..).unwrap_or(&[]);

        if separator.is_empty() {
            return hard_split(text, size);
        }

        let sep_len = separator.chars().count();
        let mut chunks = Vec::new();
        let mut current_parts: Vec<&str> = Vec::new();
        let mut current_size = 0usize;

        for split in text.split(separator) {
            let split_size = split.chars().count();

            if split_size > size {
                if !current_parts.is_empty() {
                    chunks.push(current_parts.join(separator));
                    current_parts.clear();
                    current_size = 0;
                }
                chunks.extend(self.split_text(split, remaining, size));
            } else if current_size + split_size + sep_len > size && !current_parts.is_empty() {
                chunks.push(current_parts.join(separator));
                current_parts = vec![split];
                current_size = split_size;
            } else {
                if !current_parts.is_empty() {
                    current_size += sep_len;
                }
                current_parts.push(split);
                current_size += split_size;
            }
        }

        if !current_parts.is_empty() {
            chunks.push(current_parts.join(separator));
        }

        chunks
    }
}

fn hard_split(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

/// Up to `max` trailing characters of `text`, starting at a word boundary.
fn overlap_tail(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if max == 0 || count == 0 {
        return String::new();
    }
    if count <= max {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - max).collect();
    match tail.find(char::is_whitespace) {
        Some(idx) => tail[idx..].trim_start().to_string(),
        None => String::new(),
    }
}

/// Units per batch, smaller batches for long documents.
pub fn batch_size(units: usize) -> usize {
    if units > 50 {
        5
    } else if units > 20 {
        10
    } else {
        20
    }
}

type Piece = (usize, String, UnitMetadata);

fn split_batch(chunker: &RecursiveChunker, batch: Vec<ExtractionUnit>) -> Vec<Piece> {
    let mut pieces = Vec::new();
    for unit in batch {
        for text in chunker.split(&unit.text) {
            pieces.push((unit.page, text, unit.metadata.clone()));
        }
    }
    pieces
}

/// Turns a document's units into numbered chunks.
#[derive(Debug, Clone)]
pub struct DocumentChunker {
    chunker: Arc<RecursiveChunker>,
    limiter: ConcurrencyLimiter,
}

impl DocumentChunker {
    pub fn new(chunker: RecursiveChunker, limiter: ConcurrencyLimiter) -> Self {
        Self {
            chunker: Arc::new(chunker),
            limiter,
        }
    }

    /// Chunk units in page order. Never returns an empty list.
    pub async fn chunk_units(&self, mut units: Vec<ExtractionUnit>) -> Result<Vec<Chunk>> {
        if units.is_empty() {
            warn!("No units to chunk, substituting placeholder");
            units.push(ExtractionUnit::placeholder(NO_CONTENT_TEXT, NO_CONTENT_ERROR));
        }
        let base_metadata = units[0].metadata.clone();

        let size = batch_size(units.len());
        let mut batches: Vec<Vec<ExtractionUnit>> = Vec::new();
        let mut rest = units.into_iter().peekable();
        while rest.peek().is_some() {
            batches.push(rest.by_ref().take(size).collect());
        }
        debug!("Chunking {} batches of up to {} units", batches.len(), size);

        let mut slots: Vec<Option<Vec<Piece>>> = vec![None; batches.len()];
        let mut set = JoinSet::new();
        for (index, batch) in batches.into_iter().enumerate() {
            let limiter = self.limiter.clone();
            let chunker = self.chunker.clone();
            set.spawn(async move {
                let _permit = limiter.acquire().await?;
                let pieces = tokio::task::spawn_blocking(move || split_batch(&chunker, batch))
                    .await
                    .map_err(|e| Error::Internal(format!("chunk batch failed: {}", e)))?;
                Ok::<_, Error>((index, pieces))
            });
        }

        while let Some(joined) = set.join_next().await {
            let (index, pieces) =
                joined.map_err(|e| Error::Internal(format!("chunk task failed: {}", e)))??;
            slots[index] = Some(pieces);
        }

        let mut chunks: Vec<Chunk> = slots
            .into_iter()
            .flatten()
            .flatten()
            .enumerate()
            .map(|(chunk_number, (page, text, metadata))| Chunk {
                chunk_number,
                page,
                text,
                metadata,
            })
            .collect();

        if chunks.is_empty() {
            warn!("Splitting produced no chunks, substituting placeholder");
            let mut metadata = base_metadata;
            metadata.error = Some(NO_CHUNKS_ERROR.to_string());
            if metadata.extraction_method.is_empty() {
                metadata.extraction_method = "none".into();
            }
            chunks.push(Chunk {
                chunk_number: 0,
                page: 1,
                text: NO_CHUNKS_TEXT.to_string(),
                metadata,
            });
        }
        Ok(chunks)
    }
}
