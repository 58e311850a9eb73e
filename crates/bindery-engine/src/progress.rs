// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Progress reporting and cooperative cancellation for engine work.
//
// Progress flows one way, from the worker to whoever observes it, and is
// best-effort: a closed channel or a panicking observer never stops a job.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bindery_core::percent_complete;
use tracing::{debug, warn};

/// Receives percent-complete values in `[0, 100]` while a job runs.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, percent: u8);
}

impl<F> ProgressSink for F
where
    F: Fn(u8) + Send + Sync,
{
    fn on_progress(&self, percent: u8) {
        self(percent)
    }
}

/// Discards progress. Used when nothing is watching.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _percent: u8) {}
}

/// Forwards progress over a std channel.
#[derive(Debug, Clone)]
pub struct ChannelProgress(pub std::sync::mpsc::Sender<u8>);

impl ProgressSink for ChannelProgress {
    fn on_progress(&self, percent: u8) {
        let _ = self.0.send(percent);
    }
}

/// Forwards progress to an async task. Unbounded, so the worker never waits.
#[derive(Debug, Clone)]
pub struct AsyncChannelProgress(pub tokio::sync::mpsc::UnboundedSender<u8>);

impl ProgressSink for AsyncChannelProgress {
    fn on_progress(&self, percent: u8) {
        let _ = self.0.send(percent);
    }
}

/// Cooperative cancellation flag shared between a caller and a running job.
///
/// Engines check it between units of work (positions, split pages), never
/// in the middle of one.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a stale request before a new job starts.
    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Turns step counts into percentages, reports them, and remembers them.
pub(crate) struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    total: u32,
    reported: Vec<u8>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(sink: &'a dyn ProgressSink, total: u32) -> Self {
        Self {
            sink,
            total,
            reported: Vec::with_capacity(total as usize),
        }
    }

    /// Report that `done` of `total` steps have finished.
    pub(crate) fn report(&mut self, done: u32) {
        let percent = percent_complete(done, self.total);
        self.reported.push(percent);
        debug!(done, total = self.total, percent, "Progress");

        let sink = self.sink;
        if catch_unwind(AssertUnwindSafe(|| sink.on_progress(percent))).is_err() {
            warn!(percent, "Progress observer panicked; continuing");
        }
    }

    pub(crate) fn into_reported(self) -> Vec<u8> {
        self.reported
    }
}
