// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Modifiable handle over an existing PDF: pages are removed in place and
// the remaining pages are renumbered.

use bindery_core::error::{BinderyError, Result};
use lopdf::Document;
use tracing::{debug, instrument};

/// A PDF opened for in-place modification.
pub struct EditableDocument {
    document: Document,
}

impl EditableDocument {
    /// Parse a PDF from raw bytes.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            BinderyError::PdfParse(format!("failed to load PDF from memory: {}", err))
        })?;
        debug!(pages = document.get_pages().len(), "PDF opened for modification");
        Ok(Self { document })
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Remove the page at a 0-based index. Every later page moves down by one.
    pub fn remove_page_at(&mut self, index: usize) -> Result<()> {
        let page_count = self.page_count();
        if index >= page_count {
            return Err(BinderyError::PageOutOfRange { index, page_count });
        }
        // lopdf numbers pages from 1.
        self.document.delete_pages(&[index as u32 + 1]);
        debug!(index, remaining = page_count - 1, "Page removed");
        Ok(())
    }

    /// Drop objects no longer reachable from the remaining pages and serialise.
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        self.document.prune_objects();
        let mut output = Vec::new();
        self.document.save_to(&mut output).map_err(|err| {
            BinderyError::PdfError(format!("failed to serialise modified PDF: {}", err))
        })?;
        Ok(output)
    }
}
