// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Split engine: cuts a page range out of a document, producing the
// extracted range and the remainder.

use bindery_core::error::Result;
use bindery_core::{SplitRequest, SplitResult};
use bindery_document::{EditableDocument, OutputDocument, SourceDocument};
use tracing::{info, instrument};

use crate::progress::{CancelToken, ProgressSink, ProgressTracker};

/// What the split engine produced.
#[derive(Debug)]
pub enum Split {
    Finished {
        result: SplitResult,
        /// Pages in remainder plus extracted; equals the input page count.
        pages: usize,
        progress: Vec<u8>,
    },
    Cancelled {
        progress: Vec<u8>,
    },
}

/// Split `document` at `request` (1-based, inclusive).
///
/// Two handles are opened on the same bytes. Pages are copied into the
/// extracted document from the read-only handle, whose numbering never
/// changes, and removed from the editable handle, whose numbering shifts
/// down after every removal. Progress is reported per extracted page and
/// cancellation is checked before each one.
#[instrument(skip(document, sink, cancel), fields(bytes_len = document.len()))]
pub fn split(
    document: &[u8],
    request: SplitRequest,
    sink: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<Split> {
    let stable = SourceDocument::from_bytes(document)?;
    let page_count = stable.page_count();
    request.validate(page_count)?;

    let mut remainder = EditableDocument::from_bytes(document)?;
    let mut extracted = OutputDocument::new();
    let mut session = stable.import_session();
    let mut tracker = ProgressTracker::new(sink, request.len() as u32);

    for (removed, page) in (request.start_page..=request.end_page).enumerate() {
        if cancel.is_cancelled() {
            info!(page, "Split cancelled");
            return Ok(Split::Cancelled {
                progress: tracker.into_reported(),
            });
        }
        let index = page as usize - 1;
        extracted.import_page(&mut session, index, None)?;
        remainder.remove_page_at(index - removed)?;
        tracker.report(removed as u32 + 1);
    }

    info!(
        remaining = remainder.page_count(),
        extracted = extracted.page_count(),
        "Split finished"
    );
    Ok(Split::Finished {
        result: SplitResult {
            remainder: remainder.into_bytes()?,
            extracted: extracted.into_bytes()?,
        },
        pages: page_count,
        progress: tracker.into_reported(),
    })
}
