// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: turning raster images into PDF pages.

pub mod page;

pub use page::{ImagePageWriter, ImagePlacement};
