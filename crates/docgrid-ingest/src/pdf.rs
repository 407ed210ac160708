//! Structural PDF access through lopdf: per-page text and embedded images.

use docgrid_core::{Error, Result};
use lopdf::{Dictionary, Document as PdfDocument, Object, ObjectId, Stream};

/// Text and image signals of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSignal {
    /// 1-based page number.
    pub page: u32,
    /// Characters of trimmed page text.
    pub text_chars: usize,
    pub images: usize,
}

/// An image XObject whose stream bytes form a standalone encoded image.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

pub fn load(bytes: &[u8]) -> Result<PdfDocument> {
    PdfDocument::load_mem(bytes).map_err(|e| Error::Extraction(format!("lopdf: {}", e)))
}

/// Page numbers and object ids in page order.
pub fn pages(doc: &PdfDocument) -> Vec<(u32, ObjectId)> {
    doc.get_pages().into_iter().collect()
}

pub fn page_text(doc: &PdfDocument, page_no: u32) -> String {
    doc.extract_text(&[page_no]).unwrap_or_default()
}

/// Signals for the first `sample` pages.
pub fn inspect(bytes: &[u8], sample: usize) -> Result<Vec<PageSignal>> {
    let doc = load(bytes)?;
    Ok(pages(&doc)
        .into_iter()
        .take(sample)
        .map(|(page, id)| PageSignal {
            page,
            text_chars: page_text(&doc, page).trim().chars().count(),
            images: image_streams(&doc, id).len(),
        })
        .collect())
}

fn resolve<'a>(doc: &'a PdfDocument, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Resources of a page, following inheritance through `Parent`.
fn page_resources(doc: &PdfDocument, page_id: ObjectId) -> Option<&Dictionary> {
    let mut current = doc.get_object(page_id).ok()?;
    // Page trees are shallow; the bound only guards against reference cycles.
    for _ in 0..32 {
        let Object::Dictionary(dict) = current else {
            return None;
        };
        if let Ok(res) = dict.get(b"Resources") {
            if let Some(Object::Dictionary(resources)) = resolve(doc, res) {
                return Some(resources);
            }
        }
        current = resolve(doc, dict.get(b"Parent").ok()?)?;
    }
    None
}

fn is_image(stream: &Stream) -> bool {
    matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name.as_slice() == b"Image")
}

fn image_streams(doc: &PdfDocument, page_id: ObjectId) -> Vec<&Stream> {
    let Some(resources) = page_resources(doc, page_id) else {
        return Vec::new();
    };
    let xobjects = match resources.get(b"XObject").ok().and_then(|o| resolve(doc, o)) {
        Some(Object::Dictionary(dict)) => dict,
        _ => return Vec::new(),
    };
    xobjects
        .iter()
        .filter_map(|(_, obj)| match resolve(doc, obj) {
            Some(Object::Stream(stream)) if is_image(stream) => Some(stream),
            _ => None,
        })
        .collect()
}

/// Mime type when the stream is a complete image file as-is.
fn standalone_mime(stream: &Stream) -> Option<&'static str> {
    let names: Vec<&[u8]> = match stream.dict.get(b"Filter").ok()? {
        Object::Name(name) => vec![name.as_slice()],
        Object::Array(items) => items
            .iter()
            .filter_map(|o| match o {
                Object::Name(name) => Some(name.as_slice()),
                _ => None,
            })
            .collect(),
        _ => return None,
    };
    // Only a lone DCT or JPX filter leaves a plain image file behind.
    match names.as_slice() {
        [b"DCTDecode"] => Some("image/jpeg"),
        [b"JPXDecode"] => Some("image/jp2"),
        _ => None,
    }
}

/// Images on a page that can be handed to a vision model unchanged.
pub fn page_images(doc: &PdfDocument, page_id: ObjectId) -> Vec<EmbeddedImage> {
    image_streams(doc, page_id)
        .into_iter()
        .filter_map(|stream| {
            standalone_mime(stream).map(|mime| EmbeddedImage {
                bytes: stream.content.clone(),
                mime,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testpdf;

    #[test]
    fn test_inspect_text_page() {
        let bytes = testpdf::build(&[testpdf::Page::Text(
            "A page with a reasonable amount of text on it for inspection.",
        )]);
        let signals = inspect(&bytes, 5).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].page, 1);
        assert!(signals[0].text_chars > 20);
        assert_eq!(signals[0].images, 0);
    }

    #[test]
    fn test_images_found_and_typed() {
        let bytes = testpdf::build(&[testpdf::Page::Image]);
        let doc = load(&bytes).unwrap();
        let (_, page_id) = pages(&doc)[0];
        let images = page_images(&doc, page_id);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].mime, "image/jpeg");
        assert_eq!(images[0].bytes, testpdf::FAKE_JPEG);
    }

    #[test]
    fn test_jpx_images_typed_as_jp2() {
        let bytes = testpdf::build(&[testpdf::Page::Jp2Image, testpdf::Page::Image]);
        let doc = load(&bytes).unwrap();
        let all = pages(&doc);

        let jp2 = page_images(&doc, all[0].1);
        assert_eq!(jp2.len(), 1);
        assert_eq!(jp2[0].mime, "image/jp2");
        assert_eq!(jp2[0].bytes, testpdf::FAKE_JP2);

        assert_eq!(page_images(&doc, all[1].1)[0].mime, "image/jpeg");
    }

    #[test]
    fn test_inspect_samples_first_pages_only() {
        let pages: Vec<_> = (0..7).map(|_| testpdf::Page::Blank).collect();
        let signals = inspect(&testpdf::build(&pages), 5).unwrap();
        assert_eq!(signals.len(), 5);
        assert!(signals.iter().all(|s| s.text_chars == 0 && s.images == 0));
    }

    #[test]
    fn test_load_rejects_garbage() {
        assert!(load(b"definitely not a pdf").is_err());
    }
}
