//! Small in-memory PDFs for tests.

use lopdf::{dictionary, Document, Object, Stream};

/// JPEG SOI/APP0/EOI markers. Not decodable, but carries the JPEG magic.
pub const FAKE_JPEG: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0xFF, 0xD9,
];

/// JPEG 2000 signature box. Not decodable either.
pub const FAKE_JP2: &[u8] = &[
    0x00, 0x00, 0x00, 0x0C, b'j', b'P', b' ', b' ', 0x0D, 0x0A, 0x87, 0x0A,
];

pub enum Page<'a> {
    Text(&'a str),
    Image,
    Jp2Image,
    TextAndImage(&'a str),
    Blank,
}

fn text_ops(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)");
    format!("BT /F1 12 Tf 72 700 Td ({}) Tj ET\n", escaped)
}

const IMAGE_OPS: &str = "q 100 0 0 100 72 500 cm /Im1 Do Q\n";

pub fn build(pages: &[Page<'_>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids = Vec::new();
    for page in pages {
        let jpeg = ("DCTDecode", FAKE_JPEG);
        let (ops, image) = match page {
            Page::Text(text) => (text_ops(text), None),
            Page::Image => (IMAGE_OPS.to_string(), Some(jpeg)),
            Page::Jp2Image => (IMAGE_OPS.to_string(), Some(("JPXDecode", FAKE_JP2))),
            Page::TextAndImage(text) => (format!("{}{}", text_ops(text), IMAGE_OPS), Some(jpeg)),
            Page::Blank => (String::new(), None),
        };

        let mut resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };
        if let Some((filter, data)) = image {
            let image = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => 1,
                    "Height" => 1,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => filter,
                },
                data.to_vec(),
            );
            let image_id = doc.add_object(image);
            resources.set("XObject", dictionary! { "Im1" => image_id });
        }

        let content_id = doc.add_object(Stream::new(dictionary! {}, ops.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
            "Contents" => content_id,
            "Resources" => resources,
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
    doc.save_to(&mut out).expect("serialize test pdf");
    out
}
