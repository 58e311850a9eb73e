// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: read-only import handles, modifiable handles, and the output
// document that pages are assembled into.

pub mod caption;
pub mod editable;
pub mod output;
pub mod source;

pub use editable::EditableDocument;
pub use output::{OutputDocument, PageRef};
pub use source::{ImportSession, SourceDocument, page_count};
