// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Bindery.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Position;

/// Top-level error type for all Bindery operations.
///
/// Cancellation is deliberately absent: a cancelled job is an outcome
/// (`JobOutcome::Cancelled`), not a failure.
#[derive(Debug, Error)]
pub enum BinderyError {
    // -- Preconditions (raised before any worker starts) --
    #[error("invalid page range {start}..={end} for a document with {page_count} pages")]
    InvalidRange {
        start: u32,
        end: u32,
        page_count: usize,
    },

    #[error("document has no pages")]
    EmptyDocument,

    #[error("invalid job setup: {0}")]
    InvalidJobSetup(String),

    #[error("a job is already running")]
    JobInProgress,

    // -- Decode / parse --
    #[error("input at position {position} could not be read: {detail}")]
    CorruptInput { position: Position, detail: String },

    #[error("PDF could not be parsed: {0}")]
    PdfParse(String),

    // -- Document library --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("page index {index} out of range (document has {page_count} pages)")]
    PageOutOfRange { index: usize, page_count: usize },

    // -- Persistence --
    #[error("failed to write {}", path.display())]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Execution --
    #[error("worker failed: {0}")]
    WorkerFailed(String),
}

impl BinderyError {
    /// Whether this error was raised by a precondition check, i.e. before
    /// any engine work started and without touching job state.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::InvalidRange { .. }
                | Self::EmptyDocument
                | Self::InvalidJobSetup(_)
                | Self::JobInProgress
        )
    }

    /// Attach the failing registry position to a decode or parse error.
    ///
    /// Only `PdfParse` and `ImageError` describe bad input bytes. Everything
    /// else, including `PdfError` from building or serialising output, passes
    /// through untouched.
    pub fn at_position(self, position: Position) -> Self {
        match self {
            Self::PdfParse(detail) | Self::ImageError(detail) => {
                Self::CorruptInput { position, detail }
            }
            other => other,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BinderyError>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn range_errors_are_preconditions() {
        let err = BinderyError::InvalidRange {
            start: 4,
            end: 2,
            page_count: 5,
        };
        assert!(err.is_precondition());
        assert!(BinderyError::EmptyDocument.is_precondition());
        assert!(!BinderyError::PdfError("bad xref".into()).is_precondition());
    }

    #[test]
    fn parse_errors_gain_a_position() {
        let err = BinderyError::ImageError("unknown format".into()).at_position(Position(3));
        match err {
            BinderyError::CorruptInput { position, detail } => {
                assert_eq!(position, Position(3));
                assert_eq!(detail, "unknown format");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn output_errors_are_not_blamed_on_the_input() {
        let err = BinderyError::PdfError("/Pages node is missing".into()).at_position(Position(2));
        assert!(matches!(err, BinderyError::PdfError(_)));

        let err = BinderyError::PdfParse("bad xref".into()).at_position(Position(2));
        assert!(matches!(
            err,
            BinderyError::CorruptInput {
                position: Position(2),
                ..
            }
        ));
    }

    #[test]
    fn io_errors_keep_their_position_free_shape() {
        let err = BinderyError::Io(std::io::Error::other("disk full")).at_position(Position(1));
        assert!(matches!(err, BinderyError::Io(_)));
    }

    #[test]
    fn persistence_failure_keeps_its_cause() {
        let err = BinderyError::PersistenceFailure {
            path: PathBuf::from("/nowhere/out.pdf"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "failed to write /nowhere/out.pdf");
        let cause = err.source().expect("source is preserved");
        assert_eq!(cause.to_string(), "denied");
    }
}
