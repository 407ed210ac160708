//! Shared fixtures for the runtime integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use docgrid_core::DocGridConfig;
use docgrid_llm::{CompletionService, VisionModel};
use docgrid_runtime::DocGrid;
use docgrid_store::MemoryVectorStore;
use lopdf::{dictionary, Document, Object, Stream};

/// JPEG markers only. Enough for the image to be found, not decoded.
pub const FAKE_JPEG: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0xFF, 0xD9,
];

/// A PDF whose pages each hold one full-page JPEG and no text.
pub fn scanned_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for _ in 0..pages {
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            FAKE_JPEG.to_vec(),
        ));
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            b"q 612 0 0 792 0 0 cm /Im1 Do Q\n".to_vec(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im1" => image_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("serialize scanned pdf");
    out
}

pub fn grid_with(
    config: DocGridConfig,
    llm: Arc<dyn CompletionService>,
    vision: Option<Arc<dyn VisionModel>>,
) -> DocGrid {
    DocGrid::new(
        config,
        Arc::new(MemoryVectorStore::new()),
        llm,
        vision,
        Vec::new(),
    )
    .expect("valid configuration")
}
