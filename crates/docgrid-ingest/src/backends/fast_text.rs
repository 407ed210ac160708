//! Fast text-layer extraction.
//!
//! PDFs go through pdf-extract in one pass; text-like files are decoded directly.

use async_trait::async_trait;
use docgrid_core::{Error, ExtractionUnit, Result};
use tracing::debug;

use super::{normalize_whitespace, ExtractionBackend, ExtractionInput};
use crate::file::{decode_text, FileType};
use crate::policy::BackendKind;

#[derive(Debug, Default)]
pub struct FastTextBackend;

impl FastTextBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Page texts from pdf-extract. Pages without text are skipped but keep their numbering.
fn pdf_pages(bytes: &[u8]) -> Result<Vec<ExtractionUnit>> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| Error::Extraction(format!("pdf-extract: {}", e)))?;
    let total = pages.len();
    let units = pages
        .iter()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let text = normalize_whitespace(raw);
            (!text.is_empty()).then(|| ExtractionUnit::new(idx + 1, text))
        })
        .collect::<Vec<_>>();
    debug!("pdf-extract: {} of {} pages carry text", units.len(), total);
    Ok(units)
}

#[async_trait]
impl ExtractionBackend for FastTextBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::FastText
    }

    /// Unknown extensions are attempted too; decoding rejects binary content.
    fn supports(&self, _extension: &str) -> bool {
        true
    }

    async fn extract(&self, input: &ExtractionInput) -> Result<Vec<ExtractionUnit>> {
        let file_type = FileType::from_extension(&input.document.extension);
        let bytes = input.bytes.clone();

        if file_type != FileType::Pdf {
            let text = decode_text(&bytes, file_type)?;
            if text.trim().is_empty() {
                return Ok(Vec::new());
            }
            return Ok(vec![ExtractionUnit::new(1, text)]);
        }

        // pdf-extract is CPU bound and may panic on hostile input; the blocking
        // pool turns a panic into a JoinError.
        tokio::task::spawn_blocking(move || pdf_pages(&bytes))
            .await
            .map_err(|e| Error::Extraction(format!("pdf-extract task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgrid_core::Document;
    use std::sync::Arc;

    fn input(name: &str, bytes: &[u8]) -> ExtractionInput {
        ExtractionInput::new(
            Document::new("doc1", name, bytes.len(), None),
            Arc::new(bytes.to_vec()),
        )
    }

    #[tokio::test]
    async fn test_plain_text_is_one_unit() {
        let units = FastTextBackend::new()
            .extract(&input("notes.md", b"# Title\n\nSome notes."))
            .await
            .unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].page, 1);
        assert!(units[0].text.contains("Some notes."));
    }

    #[tokio::test]
    async fn test_blank_text_is_empty_result() {
        let units = FastTextBackend::new()
            .extract(&input("empty.txt", b"   \n  "))
            .await
            .unwrap();
        assert!(units.is_empty());
    }

    #[tokio::test]
    async fn test_garbage_pdf_is_error() {
        let result = FastTextBackend::new()
            .extract(&input("broken.pdf", b"%PDF-1.4 not really"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_binary_unknown_is_error() {
        let result = FastTextBackend::new()
            .extract(&input("image.png", &[0x89, b'P', b'N', b'G', 0xFF, 0xFE, 0x00]))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_pdf_pages_skip_blank() {
        use crate::testpdf::{build, Page};
        let bytes = build(&[Page::Text("First page words"), Page::Blank, Page::Text("Third")]);
        let units = FastTextBackend::new()
            .extract(&input("doc.pdf", &bytes))
            .await
            .unwrap();
        let pages: Vec<usize> = units.iter().map(|u| u.page).collect();
        assert_eq!(pages, vec![1, 3]);
        assert!(units[0].text.contains("First page words"));
    }
}
