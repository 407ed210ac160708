//! Content profiling: decides whether a document carries a text layer, images, or both.

use docgrid_core::Classification;
use tracing::debug;

/// Pages sampled from the start of a PDF.
pub const SAMPLE_PAGES: usize = 5;
/// A page needs more trimmed characters than this to count as a text page.
pub const SIGNIFICANT_TEXT_CHARS: usize = 100;
/// Bytes scanned by the marker heuristic.
const MARKER_WINDOW: usize = 5 * 1024;

/// Labels documents as text, scanned, mixed or unknown.
#[derive(Debug, Clone)]
pub struct ContentClassifier {
    pub large_document_bytes: usize,
    pub sample_pages: usize,
    pub significant_text_chars: usize,
}

impl Default for ContentClassifier {
    fn default() -> Self {
        Self::new(10_000_000)
    }
}

impl ContentClassifier {
    pub fn new(large_document_bytes: usize) -> Self {
        Self {
            large_document_bytes,
            sample_pages: SAMPLE_PAGES,
            significant_text_chars: SIGNIFICANT_TEXT_CHARS,
        }
    }

    /// Never fails. `extension` is the lowercased extension without the dot.
    pub fn classify(&self, bytes: &[u8], extension: &str) -> Classification {
        if extension.trim_start_matches('.') != "pdf" {
            return Classification::Text;
        }
        if bytes.len() > self.large_document_bytes {
            debug!(
                "PDF of {} bytes over inspection threshold, treating as scanned",
                bytes.len()
            );
            return Classification::Scanned;
        }
        self.classify_pdf(bytes)
    }

    #[cfg(feature = "pdf-inspect")]
    fn classify_pdf(&self, bytes: &[u8]) -> Classification {
        // lopdf can panic on malformed cross-reference tables.
        let inspected = std::panic::catch_unwind(|| crate::pdf::inspect(bytes, self.sample_pages));
        let signals = match inspected {
            Ok(Ok(signals)) if !signals.is_empty() => signals,
            Ok(Ok(_)) => {
                debug!("PDF has no readable pages, scanning for markers");
                return classify_by_markers(marker_window(bytes));
            }
            Ok(Err(e)) => {
                debug!("PDF inspection failed ({}), scanning for markers", e);
                return classify_by_markers(marker_window(bytes));
            }
            Err(_) => {
                debug!("PDF inspection panicked, scanning for markers");
                return classify_by_markers(marker_window(bytes));
            }
        };

        let text_pages = signals
            .iter()
            .filter(|s| s.text_chars > self.significant_text_chars)
            .count();
        let image_pages = signals.iter().filter(|s| s.images > 0).count();
        debug!(
            "Sampled {} pages: {} with text, {} with images",
            signals.len(),
            text_pages,
            image_pages
        );
        decide(text_pages, image_pages)
    }

    #[cfg(not(feature = "pdf-inspect"))]
    fn classify_pdf(&self, bytes: &[u8]) -> Classification {
        classify_by_markers(marker_window(bytes))
    }
}

#[cfg(feature = "pdf-inspect")]
fn decide(text_pages: usize, image_pages: usize) -> Classification {
    match (text_pages > 0, image_pages > 0) {
        (false, true) => Classification::Scanned,
        (true, false) => Classification::Text,
        (true, true) => Classification::Mixed,
        (false, false) => Classification::Unknown,
    }
}

fn marker_window(bytes: &[u8]) -> &[u8] {
    &bytes[..bytes.len().min(MARKER_WINDOW)]
}

/// Byte-level guess for PDFs the parser cannot open.
fn classify_by_markers(window: &[u8]) -> Classification {
    let has = |needle: &[u8]| window.windows(needle.len()).any(|w| w == needle);
    if has(b"/Text") || has(b"/Font") {
        Classification::Text
    } else if has(b"/Image") || has(b"/XObject") {
        Classification::Scanned
    } else {
        Classification::Unknown
    }
}
