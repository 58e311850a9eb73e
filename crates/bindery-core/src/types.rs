// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Bindery document assembler.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BinderyError, Result};

/// Unique identifier for an assembly or split job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 1-based insertion-order index of an input entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position(pub u32);

impl Position {
    pub const FIRST: Position = Position(1);

    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single input added to a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEntry {
    /// Raster image bytes, drawn onto one new page.
    Image {
        bytes: Vec<u8>,
        /// Drawn height in points; `None` fills the page minus margins.
        target_height: Option<u32>,
    },
    /// An existing PDF whose pages are imported in order.
    Document { bytes: Vec<u8> },
}

impl InputEntry {
    /// Image entry. A target height of zero means "fill the page".
    pub fn image(bytes: Vec<u8>, target_height: Option<u32>) -> Self {
        Self::Image {
            bytes,
            target_height: target_height.filter(|h| *h > 0),
        }
    }

    pub fn document(bytes: Vec<u8>) -> Self {
        Self::Document { bytes }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image { .. })
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Image { bytes, .. } | Self::Document { bytes } => bytes,
        }
    }
}

/// Rotation applied to every imported page of a single-document job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationSpec {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl RotationSpec {
    /// Map an orientation code to a rotation.
    ///
    /// The codes are the EXIF orientation values for the four upright
    /// rotations (1, 6, 3, 8). Every other code means "no rotation".
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Deg0),
            6 => Some(Self::Deg90),
            3 => Some(Self::Deg180),
            8 => Some(Self::Deg270),
            _ => None,
        }
    }

    /// Value written to the page's `/Rotate` entry.
    pub fn degrees(self) -> i64 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }
}

/// Inclusive, 1-based page range to cut out of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRequest {
    pub start_page: u32,
    pub end_page: u32,
}

impl SplitRequest {
    pub fn new(start_page: u32, end_page: u32) -> Self {
        Self {
            start_page,
            end_page,
        }
    }

    /// Number of pages the extracted document will hold.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        (self.end_page - self.start_page + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end_page < self.start_page
    }

    /// Check `1 <= start <= end <= page_count` against a source document.
    pub fn validate(&self, page_count: usize) -> Result<()> {
        if page_count == 0 {
            return Err(BinderyError::EmptyDocument);
        }
        let in_bounds = |page: u32| page >= 1 && page as usize <= page_count;
        if self.start_page > self.end_page || !in_bounds(self.start_page) || !in_bounds(self.end_page)
        {
            return Err(BinderyError::InvalidRange {
                start: self.start_page,
                end: self.end_page,
                page_count,
            });
        }
        Ok(())
    }
}

/// The two documents produced by a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitResult {
    /// The original minus the requested range.
    pub remainder: Vec<u8>,
    /// Exactly the requested range, in original order.
    pub extracted: Vec<u8>,
}

/// What to do with a job's result once the engine has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalAction {
    /// Persist the assembled document to a path chosen by the save target.
    Save,
    /// Hand back the serialised assembled document.
    ReturnBytes,
    /// Cut a page range out of the job's document.
    Split(SplitRequest),
}

/// Lifecycle states of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// No job has run yet.
    Idle,
    /// Engine work in progress.
    Running,
    /// Engine finished and the terminal action was performed.
    Completed,
    /// Cancellation was observed; no output.
    Cancelled,
    /// Engine or terminal action failed; no output.
    Failed,
}

/// Result of a job that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Output written. `path` is `None` when the save target declined.
    Saved { path: Option<PathBuf> },
    /// Serialised assembled document.
    Bytes(Vec<u8>),
    /// Remainder and extracted documents.
    Split(SplitResult),
    /// Cancellation was observed before the engine finished.
    Cancelled,
    /// The engine produced no pages, so no terminal action was performed.
    Empty,
}

/// History entry describing one job run by the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub action: TerminalAction,
    pub status: JobStatus,
    /// Pages in the engine's output (remainder + extracted for splits).
    pub pages: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl JobRecord {
    pub fn new(action: TerminalAction) -> Self {
        Self {
            id: JobId::new(),
            action,
            status: JobStatus::Running,
            pages: 0,
            started_at: Utc::now(),
            finished_at: None,
            error_message: None,
        }
    }

    /// Close the record with a terminal status.
    pub fn finish(&mut self, status: JobStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Tabloid => (279, 432),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }

    /// Dimensions in PDF points (1/72 inch).
    pub fn dimensions_pt(&self) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        (mm_to_pt(w as f32), mm_to_pt(h as f32))
    }
}

fn mm_to_pt(mm: f32) -> f32 {
    mm * 72.0 / 25.4
}

/// Percentage of a job done after `position` of `total` positions.
///
/// Rounds half away from zero; both operands are non-negative so this is
/// `floor(x + 0.5)` done in integers.
pub fn percent_complete(position: u32, total: u32) -> u8 {
    if total == 0 {
        return 100;
    }
    let position = u64::from(position.min(total));
    let total = u64::from(total);
    ((200 * position + total) / (2 * total)) as u8
}
