// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Read-only import handle over an existing PDF, and the per-source session
// that deep-copies its pages into another document.

use std::collections::HashMap;

use bindery_core::error::{BinderyError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, instrument, warn};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guard against malformed, cyclic page trees.
const MAX_TREE_DEPTH: usize = 32;

/// Count the pages of a PDF without keeping it open.
#[instrument(skip_all, fields(bytes_len = data.len()))]
pub fn page_count(data: &[u8]) -> Result<usize> {
    Ok(SourceDocument::from_bytes(data)?.page_count())
}

/// A PDF opened for reading and importing pages. Never modified, so page
/// indices stay stable for the lifetime of the handle.
pub struct SourceDocument {
    pub(crate) document: Document,
    /// Page object IDs in page order.
    pages: Vec<ObjectId>,
}

impl SourceDocument {
    /// Parse a PDF from raw bytes.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            BinderyError::PdfParse(format!("failed to load PDF from memory: {}", err))
        })?;

        // `get_pages` is keyed by 1-based page number, so values come out in order.
        let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
        debug!(pages = pages.len(), "PDF opened for import");

        Ok(Self { document, pages })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Object ID of the page at a 0-based index.
    pub(crate) fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.pages
            .get(index)
            .copied()
            .ok_or(BinderyError::PageOutOfRange {
                index,
                page_count: self.pages.len(),
            })
    }

    /// Start copying pages of this document into another one.
    pub fn import_session(&self) -> ImportSession<'_> {
        ImportSession {
            source: self,
            copied: HashMap::new(),
        }
    }
}

/// Copies objects from one source document into a target document.
///
/// Every source object is copied at most once per session, so resources
/// shared between pages (fonts, images) stay shared in the target and
/// reference cycles terminate.
pub struct ImportSession<'s> {
    source: &'s SourceDocument,
    /// Source object ID -> target object ID.
    copied: HashMap<ObjectId, ObjectId>,
}

impl<'s> ImportSession<'s> {
    pub fn source(&self) -> &'s SourceDocument {
        self.source
    }

    /// Deep-copy the page at `index` into `target` and return the new page
    /// dictionary, not yet attached to any page tree.
    ///
    /// Inherited attributes are materialised on the copy, and `/Parent` is
    /// left for the caller to set.
    pub(crate) fn copy_page(
        &mut self,
        target: &mut Document,
        index: usize,
    ) -> Result<(ObjectId, Dictionary)> {
        let source = self.source;
        let page_id = source.page_id(index)?;
        let page = source.document.get_dictionary(page_id).map_err(|err| {
            BinderyError::PdfParse(format!("cannot read page object {:?}: {}", page_id, err))
        })?;

        // An earlier page may already have linked here and reserved an ID;
        // the caller stores the finished page under that same ID. Otherwise
        // register it now so annotations pointing back resolve to the copy.
        let new_id = match self.copied.get(&page_id).copied() {
            Some(id) => id,
            None => {
                let id = target.new_object_id();
                self.copied.insert(page_id, id);
                id
            }
        };

        let mut copy = self.copy_dictionary(target, page, true);
        for (key, value) in inherited_attributes(&source.document, page) {
            let value = self.copy_object(target, &value);
            copy.set(key, value);
        }

        Ok((new_id, copy))
    }

    fn copy_object(&mut self, target: &mut Document, object: &Object) -> Object {
        match object {
            Object::Reference(id) => match self.copy_reference(target, *id) {
                Some(new_id) => Object::Reference(new_id),
                None => Object::Null,
            },
            Object::Dictionary(dict) => {
                let page_tree_node = is_page_tree_node(dict);
                Object::Dictionary(self.copy_dictionary(target, dict, page_tree_node))
            }
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_object(target, item))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.copy_dictionary(target, &stream.dict, false);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    /// Copy a dictionary's entries. `skip_parent` drops `/Parent`, which on
    /// a page-tree node leads back up the source tree; annotations keep theirs.
    fn copy_dictionary(
        &mut self,
        target: &mut Document,
        dict: &Dictionary,
        skip_parent: bool,
    ) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            if skip_parent && key.as_slice() == b"Parent" {
                continue;
            }
            let value = self.copy_object(target, value);
            copy.set(key.clone(), value);
        }
        copy
    }

    fn copy_reference(&mut self, target: &mut Document, id: ObjectId) -> Option<ObjectId> {
        if let Some(new_id) = self.copied.get(&id) {
            return Some(*new_id);
        }

        let source = self.source;
        let object = match source.document.get_object(id) {
            Ok(object) => object,
            Err(err) => {
                warn!(?id, %err, "Cannot resolve reference, using Null");
                return None;
            }
        };

        let new_id = target.new_object_id();
        self.copied.insert(id, new_id);
        let copy = self.copy_object(target, object);
        target.objects.insert(new_id, copy);
        Some(new_id)
    }
}

/// `/Type /Page` or `/Type /Pages`.
fn is_page_tree_node(dict: &Dictionary) -> bool {
    matches!(
        dict.get(b"Type").and_then(|t| t.as_name()),
        Ok(b"Page") | Ok(b"Pages")
    )
}

/// Inheritable attributes the page does not set itself, taken from the
/// nearest ancestor that does.
fn inherited_attributes(document: &Document, page: &Dictionary) -> Vec<(&'static [u8], Object)> {
    let mut found: Vec<(&'static [u8], Object)> = Vec::new();
    let mut parent = page.get(b"Parent").and_then(|p| p.as_reference()).ok();
    let mut depth = 0;

    while let Some(node_id) = parent {
        if depth >= MAX_TREE_DEPTH {
            break;
        }
        let Ok(node) = document.get_dictionary(node_id) else {
            break;
        };
        for key in INHERITABLE {
            if page.has(key) || found.iter().any(|(k, _)| *k == key) {
                continue;
            }
            if let Ok(value) = node.get(key) {
                found.push((key, value.clone()));
            }
        }
        parent = node.get(b"Parent").and_then(|p| p.as_reference()).ok();
        depth += 1;
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn counts_pages() {
        let pdf = testing::pdf_with_pages(4);
        assert_eq!(page_count(&pdf).unwrap(), 4);
    }

    #[test]
    fn page_count_is_pure() {
        let pdf = testing::pdf_with_pages(3);
        let before = pdf.clone();
        assert_eq!(page_count(&pdf).unwrap(), page_count(&pdf).unwrap());
        assert_eq!(pdf, before);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = SourceDocument::from_bytes(b"definitely not a pdf").err().unwrap();
        assert!(matches!(err, BinderyError::PdfParse(_)));
    }

    #[test]
    fn index_past_the_end_is_out_of_range() {
        let source = SourceDocument::from_bytes(&testing::pdf_with_pages(2)).unwrap();
        let err = source.page_id(2).unwrap_err();
        assert!(matches!(
            err,
            BinderyError::PageOutOfRange {
                index: 2,
                page_count: 2
            }
        ));
    }

    #[test]
    fn inherited_media_box_is_materialised() {
        let source = SourceDocument::from_bytes(&testing::pdf_with_pages(1)).unwrap();
        let mut target = Document::with_version("1.5");
        let mut session = source.import_session();
        let (_, page) = session.copy_page(&mut target, 0).unwrap();

        assert!(page.has(b"MediaBox"));
        assert!(page.has(b"Resources"));
        assert!(!page.has(b"Parent"));
    }

    #[test]
    fn forward_links_reuse_the_reserved_page_id() {
        let source = SourceDocument::from_bytes(&testing::annotated_pdf()).unwrap();
        let mut target = Document::with_version("1.5");
        let mut session = source.import_session();

        let (_, first) = session.copy_page(&mut target, 0).unwrap();
        let annots = first.get(b"Annots").unwrap().as_array().unwrap();
        let link = target
            .get_dictionary(annots[0].as_reference().unwrap())
            .unwrap();
        let dest = link.get(b"Dest").unwrap().as_array().unwrap()[0]
            .as_reference()
            .unwrap();

        let (second_id, _) = session.copy_page(&mut target, 1).unwrap();
        assert_eq!(second_id, dest);
    }

    #[test]
    fn annotation_parent_is_kept() {
        let source = SourceDocument::from_bytes(&testing::annotated_pdf()).unwrap();
        let mut target = Document::with_version("1.5");
        let mut session = source.import_session();
        let (_, page) = session.copy_page(&mut target, 0).unwrap();

        let annots = page.get(b"Annots").unwrap().as_array().unwrap();
        let popup = target
            .get_dictionary(annots[2].as_reference().unwrap())
            .unwrap();
        assert_eq!(popup.get(b"Subtype").unwrap().as_name().unwrap(), b"Popup");
        let parent = popup.get(b"Parent").unwrap().as_reference().unwrap();
        assert_eq!(parent, annots[1].as_reference().unwrap());
        assert!(!page.has(b"Parent"));
    }

    #[test]
    fn shared_resources_are_copied_once() {
        let source = SourceDocument::from_bytes(&testing::pdf_with_pages(3)).unwrap();
        let mut target = Document::with_version("1.5");
        let mut session = source.import_session();

        let mut resources = Vec::new();
        for index in 0..3 {
            let (_, page) = session.copy_page(&mut target, index).unwrap();
            resources.push(page.get(b"Resources").unwrap().clone());
        }
        // The fixture's font dictionary is one indirect object shared by all
        // pages; every copy must point at the same target object.
        let font_refs: Vec<_> = resources
            .iter()
            .map(|r| {
                r.as_dict()
                    .unwrap()
                    .get(b"Font")
                    .unwrap()
                    .as_dict()
                    .unwrap()
                    .get(b"F1")
                    .unwrap()
                    .as_reference()
                    .unwrap()
            })
            .collect();
        assert!(font_refs.windows(2).all(|w| w[0] == w[1]));
    }
}
