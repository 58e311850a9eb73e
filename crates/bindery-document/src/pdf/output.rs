// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output document: a fresh PDF that pages are appended to one at a time,
// optionally rotated on import and stamped with a page-number caption.

use bindery_core::error::{BinderyError, Result};
use bindery_core::{CaptionStyle, RotationSpec};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, instrument};

use super::caption::{self, CAPTION_FONT_KEY, DEFAULT_MEDIA_BOX, Rect};
use super::source::ImportSession;

/// Index of a page within an [`OutputDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRef(pub usize);

/// A document under construction.
///
/// Starts with an empty page tree; pages are only ever appended.
pub struct OutputDocument {
    document: Document,
    /// The single /Pages node every page hangs off.
    pages_id: ObjectId,
    /// Page object IDs in page order.
    pages: Vec<ObjectId>,
    /// Font dictionary for captions, created on first use.
    caption_font: Option<ObjectId>,
}

impl Default for OutputDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDocument {
    /// Create an empty document: catalog plus an empty page tree.
    pub fn new() -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        document.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(Vec::new())),
                ("Count", Object::Integer(0)),
            ])),
        );
        let catalog_id = document.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        document.trailer.set("Root", Object::Reference(catalog_id));

        Self {
            document,
            pages_id,
            pages: Vec::new(),
            caption_font: None,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Append a copy of the session's page at `index`.
    ///
    /// A rotation sets `/Rotate` on the copy; content is not re-rendered and
    /// the source document is untouched.
    pub fn import_page(
        &mut self,
        session: &mut ImportSession<'_>,
        index: usize,
        rotation: Option<RotationSpec>,
    ) -> Result<PageRef> {
        let (page_id, mut page) = session.copy_page(&mut self.document, index)?;
        page.set("Parent", Object::Reference(self.pages_id));
        if let Some(rotation) = rotation {
            page.set("Rotate", Object::Integer(rotation.degrees()));
        }
        self.document.objects.insert(page_id, Object::Dictionary(page));
        self.append_to_page_tree(page_id)?;

        debug!(index, page = self.pages.len(), ?rotation, "Page imported");
        Ok(PageRef(self.pages.len() - 1))
    }

    /// Draw `text` centred at the bottom of `page` as it is displayed, so a
    /// page carrying `/Rotate` gets its caption upright on the visual bottom.
    ///
    /// Existing content is wrapped in `q`/`Q` so that whatever graphics state
    /// it leaves behind cannot move or recolour the caption.
    #[instrument(skip(self, style), fields(page = page.0))]
    pub fn stamp_caption(&mut self, page: PageRef, text: &str, style: &CaptionStyle) -> Result<()> {
        let page_id = *self.pages.get(page.0).ok_or(BinderyError::PageOutOfRange {
            index: page.0,
            page_count: self.pages.len(),
        })?;

        let media_box = self.media_box(page_id);
        let rotate = self.rotation(page_id);
        let font_id = self.caption_font_id(&style.font);
        let resources = self.resources_with_caption_font(page_id, font_id)?;
        let existing = self.existing_contents(page_id)?;

        let overlay = caption::caption_operators(text, style, media_box, rotate);
        let contents = if existing.is_empty() {
            vec![Object::Reference(self.add_content(overlay))]
        } else {
            let open = self.add_content("q\n".to_string());
            let close = self.add_content(format!("\nQ\n{overlay}"));
            let mut contents = Vec::with_capacity(existing.len() + 2);
            contents.push(Object::Reference(open));
            contents.extend(existing);
            contents.push(Object::Reference(close));
            contents
        };

        let page_dict = self.page_dictionary_mut(page_id)?;
        page_dict.set("Resources", Object::Dictionary(resources));
        page_dict.set("Contents", Object::Array(contents));
        Ok(())
    }

    /// Compress streams and serialise.
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        self.document.compress();
        let mut output = Vec::new();
        self.document.save_to(&mut output).map_err(|err| {
            BinderyError::PdfError(format!("failed to serialise output PDF: {}", err))
        })?;
        debug!(pages = self.pages.len(), output_bytes = output.len(), "Output serialised");
        Ok(output)
    }

    // -- Helpers --------------------------------------------------------------

    fn append_to_page_tree(&mut self, page_id: ObjectId) -> Result<()> {
        self.pages.push(page_id);
        let count = self.pages.len() as i64;

        match self.document.get_object_mut(self.pages_id) {
            Ok(Object::Dictionary(pages_dict)) => {
                if let Ok(Object::Array(kids)) = pages_dict.get_mut(b"Kids") {
                    kids.push(Object::Reference(page_id));
                }
                pages_dict.set("Count", Object::Integer(count));
                Ok(())
            }
            _ => Err(BinderyError::PdfError("/Pages node is missing".to_string())),
        }
    }

    fn page_dictionary(&self, page_id: ObjectId) -> Result<&Dictionary> {
        self.document.get_dictionary(page_id).map_err(|err| {
            BinderyError::PdfError(format!("cannot read page object {:?}: {}", page_id, err))
        })
    }

    fn page_dictionary_mut(&mut self, page_id: ObjectId) -> Result<&mut Dictionary> {
        match self.document.get_object_mut(page_id) {
            Ok(Object::Dictionary(dict)) => Ok(dict),
            _ => Err(BinderyError::PdfError(format!(
                "page object {:?} is not a dictionary",
                page_id
            ))),
        }
    }

    /// Follow a reference, or return the object itself.
    fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        match object {
            Object::Reference(id) => self.document.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn media_box(&self, page_id: ObjectId) -> Rect {
        let numbers: Option<Vec<f32>> = self
            .page_dictionary(page_id)
            .ok()
            .and_then(|page| page.get(b"MediaBox").ok())
            .and_then(|media_box| self.resolve(media_box))
            .and_then(|media_box| media_box.as_array().ok())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| self.resolve(item).and_then(as_number))
                    .collect()
            });

        match numbers.as_deref() {
            Some([x0, y0, x1, y1]) => Rect {
                x0: x0.min(*x1),
                y0: y0.min(*y1),
                x1: x0.max(*x1),
                y1: y0.max(*y1),
            },
            _ => DEFAULT_MEDIA_BOX,
        }
    }

    /// `/Rotate` normalised to `[0, 360)`.
    fn rotation(&self, page_id: ObjectId) -> i64 {
        self.page_dictionary(page_id)
            .ok()
            .and_then(|page| page.get(b"Rotate").ok())
            .and_then(|rotate| self.resolve(rotate))
            .and_then(|rotate| rotate.as_i64().ok())
            .map_or(0, |degrees| degrees.rem_euclid(360))
    }

    fn caption_font_id(&mut self, base_font: &str) -> ObjectId {
        if let Some(id) = self.caption_font {
            return id;
        }
        let id = self.document.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(base_font.as_bytes().to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ]));
        self.caption_font = Some(id);
        id
    }

    /// The page's resources as an inline dictionary with the caption font
    /// added. Shared resource dictionaries are copied, never edited.
    fn resources_with_caption_font(&self, page_id: ObjectId, font_id: ObjectId) -> Result<Dictionary> {
        let page = self.page_dictionary(page_id)?;
        let mut resources = page
            .get(b"Resources")
            .ok()
            .and_then(|r| self.resolve(r))
            .and_then(|r| r.as_dict().ok())
            .cloned()
            .unwrap_or_else(Dictionary::new);
        let mut fonts = resources
            .get(b"Font")
            .ok()
            .and_then(|f| self.resolve(f))
            .and_then(|f| f.as_dict().ok())
            .cloned()
            .unwrap_or_else(Dictionary::new);
        fonts.set(CAPTION_FONT_KEY, Object::Reference(font_id));
        resources.set("Font", Object::Dictionary(fonts));
        Ok(resources)
    }

    /// The page's content streams as a flat list of references.
    fn existing_contents(&self, page_id: ObjectId) -> Result<Vec<Object>> {
        let page = self.page_dictionary(page_id)?;
        let contents = match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match self.document.get_object(*id) {
                // An indirect array of streams.
                Ok(Object::Array(items)) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        Ok(contents)
    }

    fn add_content(&mut self, content: String) -> ObjectId {
        self.document
            .add_object(Stream::new(Dictionary::new(), content.into_bytes()))
    }
}

fn as_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}
