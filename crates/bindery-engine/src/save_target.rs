// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Where `save` writes the assembled document.

use std::path::PathBuf;

/// Chooses the destination of a save. `None` means the user declined, and
/// the save completes without writing anything.
pub trait SaveTarget: Send + Sync {
    fn choose_path(&self) -> Option<PathBuf>;
}

/// Always saves to the same path.
#[derive(Debug, Clone)]
pub struct FixedPath(pub PathBuf);

impl SaveTarget for FixedPath {
    fn choose_path(&self) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

/// Asks the user with a native save dialog filtered to PDF files.
#[cfg(feature = "dialog")]
#[derive(Debug, Clone)]
pub struct SaveDialog {
    pub default_file_name: String,
}

#[cfg(feature = "dialog")]
impl Default for SaveDialog {
    fn default() -> Self {
        Self {
            default_file_name: "document.pdf".to_string(),
        }
    }
}

#[cfg(feature = "dialog")]
impl SaveTarget for SaveDialog {
    fn choose_path(&self) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .add_filter("PDF", &["pdf"])
            .set_file_name(&self.default_file_name)
            .save_file()
    }
}
