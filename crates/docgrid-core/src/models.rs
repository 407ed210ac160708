//! Document, extraction unit and chunk models shared by the pipeline crates.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Inferred content profile of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Pages carry an extractable text layer.
    Text,
    /// Image-only pages, or a document too large to inspect.
    Scanned,
    /// Both text pages and image pages were seen.
    Mixed,
    /// Nothing conclusive.
    Unknown,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Text => write!(f, "text"),
            Classification::Scanned => write!(f, "scanned"),
            Classification::Mixed => write!(f, "mixed"),
            Classification::Unknown => write!(f, "unknown"),
        }
    }
}

/// An uploaded document. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    /// Lowercased extension without the leading dot.
    pub extension: String,
    pub size: usize,
    /// Content key of the bytes (see the ingest cache). Empty until computed.
    #[serde(default)]
    pub content_hash: String,
    /// Where the uploaded bytes were persisted, if anywhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Document {
    pub fn new(id: impl Into<String>, filename: &str, size: usize, path: Option<PathBuf>) -> Self {
        Self {
            id: id.into(),
            filename: filename.to_string(),
            extension: extension_of(filename),
            size,
            content_hash: String::new(),
            path,
        }
    }

    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = hash.into();
        self
    }

    pub fn is_pdf(&self) -> bool {
        self.extension == "pdf"
    }
}

/// Lowercased extension of a filename, without the dot. Empty when there is none.
pub fn extension_of(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Metadata carried by every extraction unit and inherited by its chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitMetadata {
    /// Id of the document the unit came from.
    pub source: String,
    pub total_pages: usize,
    /// Backend that produced the unit.
    pub extraction_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One page (or logical block) of extracted content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionUnit {
    /// 1-based page number.
    pub page: usize,
    pub text: String,
    pub metadata: UnitMetadata,
}

impl ExtractionUnit {
    pub fn new(page: usize, text: impl Into<String>) -> Self {
        Self {
            page,
            text: text.into(),
            metadata: UnitMetadata::default(),
        }
    }

    /// Synthetic unit standing in for content that could not be produced.
    pub fn placeholder(text: &str, error: &str) -> Self {
        let mut unit = Self::new(1, text);
        unit.metadata.total_pages = 1;
        unit.metadata.extraction_method = "none".into();
        unit.metadata.error = Some(error.to_string());
        unit
    }

    pub fn is_error(&self) -> bool {
        self.metadata.error.is_some()
    }

    pub fn has_content(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// A retrieval-sized slice of a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique within the document, increasing with page order.
    pub chunk_number: usize,
    pub page: usize,
    pub text: String,
    pub metadata: UnitMetadata,
}

impl Chunk {
    pub fn is_error(&self) -> bool {
        self.metadata.error.is_some()
    }
}

/// Kind of constraint attached to a query prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Answer must be one of the options.
    MustReturn,
    /// Answer should prefer the options.
    MayReturn,
    /// Cap on the number of items or characters.
    MaxLength,
    /// Options are `keyword:replacement` pairs applied after answering.
    ResolveEntity,
}

/// A constraint on how a prompt is answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
}

impl Rule {
    pub fn new(rule_type: RuleType, options: Vec<String>) -> Self {
        Self {
            rule_type,
            options,
            length: None,
        }
    }
}
