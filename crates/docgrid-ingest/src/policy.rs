//! Strategy selection: which extraction backends to try, and in what order.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use docgrid_core::{Classification, Error};
use serde::{Deserialize, Serialize};

/// Extraction backends known to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Text layer via pdf-extract, or plain decoding for text-like files.
    FastText,
    /// Per-page structural text through lopdf.
    Structured,
    /// Embedded page images transcribed by a vision model.
    ModelAssisted,
    /// Externally registered OCR service.
    CloudOcr,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::FastText => "fast_text",
            BackendKind::Structured => "structured",
            BackendKind::ModelAssisted => "model_assisted",
            BackendKind::CloudOcr => "cloud_ocr",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fast_text" => Ok(BackendKind::FastText),
            "structured" => Ok(BackendKind::Structured),
            "model_assisted" => Ok(BackendKind::ModelAssisted),
            "cloud_ocr" => Ok(BackendKind::CloudOcr),
            other => Err(Error::Config(format!("unknown extraction backend: {}", other))),
        }
    }
}

/// Coarse file family used as the first policy key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Pdf,
    Other,
}

impl FileKind {
    pub fn from_extension(ext: &str) -> Self {
        if ext.trim_start_matches('.').eq_ignore_ascii_case("pdf") {
            FileKind::Pdf
        } else {
            FileKind::Other
        }
    }
}

/// Table from (file kind, classification) to an ordered backend list.
#[derive(Debug, Clone)]
pub struct StrategyPolicy {
    table: HashMap<(FileKind, Classification), Vec<BackendKind>>,
}

const CLASSIFICATIONS: [Classification; 4] = [
    Classification::Text,
    Classification::Scanned,
    Classification::Mixed,
    Classification::Unknown,
];

impl StrategyPolicy {
    /// Default table. `primary` serves non-PDF input; `cloud_ocr` is appended
    /// to the image-capable rows only when `ocr_enabled`.
    pub fn default_for(primary: BackendKind, ocr_enabled: bool) -> Self {
        use BackendKind::*;

        let with_ocr = |mut order: Vec<BackendKind>| {
            if ocr_enabled {
                order.push(CloudOcr);
            }
            order
        };

        let mut table = HashMap::new();
        for class in CLASSIFICATIONS {
            table.insert((FileKind::Other, class), vec![primary]);
        }
        table.insert(
            (FileKind::Pdf, Classification::Scanned),
            with_ocr(vec![Structured, ModelAssisted]),
        );
        table.insert(
            (FileKind::Pdf, Classification::Text),
            vec![FastText, Structured],
        );
        for class in [Classification::Mixed, Classification::Unknown] {
            table.insert(
                (FileKind::Pdf, class),
                with_ocr(vec![FastText, Structured, ModelAssisted]),
            );
        }
        Self { table }
    }

    /// Ordered backends for a document. Never empty.
    pub fn select(&self, extension: &str, class: Classification) -> Vec<BackendKind> {
        let kind = FileKind::from_extension(extension);
        self.table
            .get(&(kind, class))
            .filter(|order| !order.is_empty())
            .cloned()
            .unwrap_or_else(|| vec![BackendKind::FastText])
    }

    /// Override one row.
    pub fn set(&mut self, kind: FileKind, class: Classification, order: Vec<BackendKind>) {
        self.table.insert((kind, class), order);
    }

    /// Every backend the table can ask for.
    pub fn backends(&self) -> Vec<BackendKind> {
        let mut all: Vec<BackendKind> = Vec::new();
        for order in self.table.values() {
            for kind in order {
                if !all.contains(kind) {
                    all.push(*kind);
                }
            }
        }
        all
    }
}

impl Default for StrategyPolicy {
    fn default() -> Self {
        Self::default_for(BackendKind::FastText, false)
    }
}
