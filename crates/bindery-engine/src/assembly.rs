// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Assembly engine: folds the input registry, position by position, into one
// output document.

use bindery_core::error::Result;
use bindery_core::{CaptionStyle, EngineConfig, InputEntry, Position};
use bindery_document::{ImagePageWriter, OutputDocument, PageRef, SourceDocument};
use tracing::{debug, info, instrument};

use crate::progress::{CancelToken, ProgressSink, ProgressTracker};
use crate::registry::InputRegistry;

/// What the engine produced.
pub enum Assembly {
    /// Every position was processed.
    Finished {
        document: OutputDocument,
        pages: usize,
        /// Percentages reported, one per position.
        progress: Vec<u8>,
    },
    /// Cancellation was observed before a position started.
    Cancelled { progress: Vec<u8> },
}

/// Running state threaded through the fold.
struct Accumulator {
    document: OutputDocument,
    page_counter: usize,
}

/// Per-job settings the fold needs at every page.
struct PageSettings<'a> {
    images: ImagePageWriter,
    caption: Option<&'a CaptionStyle>,
}

/// Build the output document for `registry`.
///
/// For each position in ascending order the image (if any) is drawn onto a
/// new page, then every page of the document (if any) is imported with the
/// job's rotation. With page numbering on, each new page is captioned
/// "Page n" where n counts pages across the whole output. Progress is
/// reported after each position; cancellation is checked before each one.
///
/// An undecodable input aborts the job with an error naming its position.
#[instrument(skip_all, fields(positions = registry.len()))]
pub fn assemble(
    registry: &InputRegistry,
    config: &EngineConfig,
    sink: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<Assembly> {
    let settings = PageSettings {
        images: ImagePageWriter::new(config.paper_size, config.image_margin_pt),
        caption: config.show_page_numbers.then_some(&config.caption),
    };
    let mut tracker = ProgressTracker::new(sink, registry.len());

    let mut acc = Accumulator {
        document: OutputDocument::new(),
        page_counter: 0,
    };
    for position in registry.positions() {
        if cancel.is_cancelled() {
            info!(%position, "Assembly cancelled");
            return Ok(Assembly::Cancelled {
                progress: tracker.into_reported(),
            });
        }
        acc = assemble_position(acc, registry, position, &settings)
            .map_err(|err| err.at_position(position))?;
        tracker.report(position.get());
    }

    info!(pages = acc.page_counter, "Assembly finished");
    Ok(Assembly::Finished {
        pages: acc.page_counter,
        document: acc.document,
        progress: tracker.into_reported(),
    })
}

fn assemble_position(
    mut acc: Accumulator,
    registry: &InputRegistry,
    position: Position,
    settings: &PageSettings<'_>,
) -> Result<Accumulator> {
    for entry in registry.entries_at(position) {
        match entry {
            InputEntry::Image {
                bytes,
                target_height,
            } => {
                let page_pdf = settings.images.render(bytes, *target_height)?;
                let source = SourceDocument::from_bytes(&page_pdf)?;
                let mut session = source.import_session();
                let page = acc.document.import_page(&mut session, 0, None)?;
                acc.page_counter += 1;
                caption_page(&mut acc, page, settings)?;
            }
            InputEntry::Document { bytes } => {
                let source = SourceDocument::from_bytes(bytes)?;
                let mut session = source.import_session();
                for index in 0..source.page_count() {
                    let page = acc
                        .document
                        .import_page(&mut session, index, registry.rotation())?;
                    acc.page_counter += 1;
                    caption_page(&mut acc, page, settings)?;
                }
            }
        }
    }
    debug!(%position, pages = acc.page_counter, "Position assembled");
    Ok(acc)
}

fn caption_page(acc: &mut Accumulator, page: PageRef, settings: &PageSettings<'_>) -> Result<()> {
    match settings.caption {
        Some(style) => {
            let text = format!("Page {}", acc.page_counter);
            acc.document.stamp_caption(page, &text, style)
        }
        None => Ok(()),
    }
}
