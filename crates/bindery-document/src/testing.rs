// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test fixtures: small lopdf-built PDFs whose pages can be told apart by
// their text, PNG images, and helpers for inspecting serialised output.
//
// Fixture pages inherit /MediaBox and /Resources from the page tree root so
// that imports have to materialise inherited attributes.

use std::io::Cursor;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat};

use crate::pdf::caption::Rect;

/// Media box shared by every fixture page.
pub const FIXTURE_MEDIA_BOX: Rect = Rect {
    x0: 0.0,
    y0: 0.0,
    x1: 500.0,
    y1: 700.0,
};

/// A PDF whose page `i` shows the text "Source page i".
pub fn pdf_with_pages(count: u32) -> Vec<u8> {
    labelled_pdf("Source page", count)
}

/// A PDF whose page `i` shows the text "{label} i".
pub fn labelled_pdf(label: &str, count: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));

    let mut page_ids = Vec::new();
    for i in 1..=count {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                Operation::new("Td", vec![Object::Integer(72), Object::Integer(600)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("{label} {i}").into_bytes(),
                        StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().expect("fixture content encodes"),
        ));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
        ]));
        page_ids.push(page_id);
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(count as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
        (
            "MediaBox",
            Object::Array(vec![
                Object::Integer(FIXTURE_MEDIA_BOX.x0 as i64),
                Object::Integer(FIXTURE_MEDIA_BOX.y0 as i64),
                Object::Integer(FIXTURE_MEDIA_BOX.x1 as i64),
                Object::Integer(FIXTURE_MEDIA_BOX.y1 as i64),
            ]),
        ),
        (
            "Resources",
            Object::Dictionary(Dictionary::from_iter(vec![(
                "Font",
                Object::Dictionary(Dictionary::from_iter(vec![(
                    "F1",
                    Object::Reference(font_id),
                )])),
            )])),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("fixture PDF serialises");
    buffer
}

/// A two-page labelled PDF whose first page carries a link to the second
/// page, a text note, and the note's popup (which points back at the note
/// through `/Parent`).
pub fn annotated_pdf() -> Vec<u8> {
    let mut doc = load(&labelled_pdf("Annotated page", 2));
    let pages: Vec<_> = doc.get_pages().into_values().collect();
    let rect = || {
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(100),
            Object::Integer(20),
        ])
    };

    let link_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Annot".to_vec())),
        ("Subtype", Object::Name(b"Link".to_vec())),
        ("Rect", rect()),
        (
            "Dest",
            Object::Array(vec![Object::Reference(pages[1]), Object::Name(b"Fit".to_vec())]),
        ),
    ]));
    let note_id = doc.new_object_id();
    let popup_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Annot".to_vec())),
        ("Subtype", Object::Name(b"Popup".to_vec())),
        ("Rect", rect()),
        ("Parent", Object::Reference(note_id)),
    ]));
    doc.objects.insert(
        note_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Annot".to_vec())),
            ("Subtype", Object::Name(b"Text".to_vec())),
            ("Rect", rect()),
            ("Contents", Object::string_literal("Note")),
            ("Popup", Object::Reference(popup_id)),
        ])),
    );

    doc.get_dictionary_mut(pages[0])
        .expect("fixture page exists")
        .set(
            "Annots",
            Object::Array(vec![
                Object::Reference(link_id),
                Object::Reference(note_id),
                Object::Reference(popup_id),
            ]),
        );

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("fixture PDF serialises");
    buffer
}

/// A solid-colour PNG.
pub fn png_image(width: u32, height: u32) -> Vec<u8> {
    let img = ::image::RgbImage::from_pixel(width, height, ::image::Rgb([200, 40, 40]));
    let mut out = Cursor::new(Vec::new());
    ::image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ::image::ImageFormat::Png)
        .expect("fixture PNG encodes");
    out.into_inner()
}

fn load(bytes: &[u8]) -> Document {
    Document::load_mem(bytes).expect("output is a readable PDF")
}

/// Every string shown with `Tj` on each page, in drawing order.
pub fn page_texts(bytes: &[u8]) -> Vec<Vec<String>> {
    let doc = load(bytes);
    doc.get_pages()
        .values()
        .map(|page_id| {
            let data = doc.get_page_content(*page_id).unwrap_or_default();
            let content = Content::decode(&data).expect("page content decodes");
            content
                .operations
                .iter()
                .filter(|op| op.operator == "Tj")
                .filter_map(|op| match op.operands.first() {
                    Some(Object::String(text, _)) => Some(String::from_utf8_lossy(text).into_owned()),
                    _ => None,
                })
                .collect()
        })
        .collect()
}

/// The first `Tj` string of each page, or "" for pages without text.
pub fn page_labels(bytes: &[u8]) -> Vec<String> {
    page_texts(bytes)
        .into_iter()
        .map(|texts| texts.into_iter().next().unwrap_or_default())
        .collect()
}

/// The `/Rotate` value set directly on each page.
pub fn page_rotations(bytes: &[u8]) -> Vec<Option<i64>> {
    let doc = load(bytes);
    doc.get_pages()
        .values()
        .map(|page_id| {
            doc.get_dictionary(*page_id)
                .ok()
                .and_then(|page| page.get(b"Rotate").ok())
                .and_then(|rotate| rotate.as_i64().ok())
        })
        .collect()
}

/// BaseFont names reachable from each page's /Resources /Font dictionary.
pub fn page_fonts(bytes: &[u8]) -> Vec<Vec<String>> {
    let doc = load(bytes);
    let resolve = |object: &Object| -> Option<Dictionary> {
        match object {
            Object::Reference(id) => doc.get_dictionary(*id).ok().cloned(),
            Object::Dictionary(dict) => Some(dict.clone()),
            _ => None,
        }
    };
    doc.get_pages()
        .values()
        .map(|page_id| {
            let Some(resources) = doc
                .get_dictionary(*page_id)
                .ok()
                .and_then(|page| page.get(b"Resources").ok())
                .and_then(resolve)
            else {
                return Vec::new();
            };
            let Some(fonts) = resources.get(b"Font").ok().and_then(resolve) else {
                return Vec::new();
            };
            fonts
                .iter()
                .filter_map(|(_, font)| resolve(font))
                .filter_map(|font| {
                    font.get(b"BaseFont")
                        .ok()
                        .and_then(|name| name.as_name().ok())
                        .map(|name| String::from_utf8_lossy(name).into_owned())
                })
                .collect()
        })
        .collect()
}
