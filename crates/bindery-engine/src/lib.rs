// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bindery-engine: input registry, assembly and split engines, and the job
// coordinator that runs them.
//
// The engines are plain functions over owned inputs. Where they run is
// decided by an `Executor`, and progress and cancellation travel through
// explicit `ProgressSink` and `CancelToken` parameters.

pub mod assembly;
pub mod coordinator;
pub mod executor;
pub mod progress;
pub mod registry;
pub mod save_target;
pub mod split;

pub use assembly::{Assembly, assemble};
pub use coordinator::Coordinator;
pub use executor::{Executor, InlineExecutor, ThreadExecutor, WorkOutput, run_blocking};
pub use progress::{AsyncChannelProgress, CancelToken, ChannelProgress, NoProgress, ProgressSink};
pub use registry::InputRegistry;
#[cfg(feature = "dialog")]
pub use save_target::SaveDialog;
pub use save_target::{FixedPath, SaveTarget};
pub use split::{Split, split};
