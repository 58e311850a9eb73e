// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::PaperSize;

/// Where the coordinator runs engine work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// On the caller's thread.
    Inline,
    /// On a dedicated worker thread, joined before the terminal action.
    DedicatedThread,
}

/// Font and placement of the running page-number caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionStyle {
    /// Base-14 font name.
    pub font: String,
    pub font_size_pt: f32,
    /// Distance between the caption's descender line and the page's bottom edge.
    pub inset_pt: f32,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font: "Helvetica-Bold".into(),
            font_size_pt: 10.0,
            inset_pt: 10.0,
        }
    }
}

/// Settings shared by every job a coordinator runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Page size for pages created from images.
    pub paper_size: PaperSize,
    /// Inset of images from every page edge.
    pub image_margin_pt: f32,
    /// Stamp "Page N" at the bottom of every output page.
    pub show_page_numbers: bool,
    pub caption: CaptionStyle,
    pub execution: ExecutionMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            paper_size: PaperSize::A4,
            image_margin_pt: 25.0,
            show_page_numbers: false,
            caption: CaptionStyle::default(),
            execution: ExecutionMode::DedicatedThread,
        }
    }
}

impl EngineConfig {
    /// Default settings with page numbering switched on or off.
    pub fn with_page_numbers(show_page_numbers: bool) -> Self {
        Self {
            show_page_numbers,
            ..Self::default()
        }
    }

    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&data)
    }

    /// Write this config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
