// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bindery-document: Document library adapter for Bindery.
//
// Opens PDFs for import or in-place modification, copies pages between
// documents (optionally rotated), stamps page-number captions, renders raster
// images onto new pages, and serialises the results.

pub mod image;
pub mod pdf;

#[cfg(any(test, feature = "fixtures"))]
pub mod testing;

pub use image::page::{ImagePageWriter, ImagePlacement};
pub use pdf::editable::EditableDocument;
pub use pdf::output::{OutputDocument, PageRef};
pub use pdf::source::{ImportSession, SourceDocument, page_count};
