// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Execution strategies for engine work. The coordinator hands over a
// self-contained unit of work; the strategy only decides where it runs.

use std::any::Any;
use std::thread;

use bindery_core::error::{BinderyError, Result};
use bindery_core::{ExecutionMode, SplitResult};
use tracing::{debug, error};

/// What a unit of engine work hands back to the coordinator.
#[derive(Debug)]
pub enum WorkOutput {
    /// Assembly finished. `bytes` is empty when `pages` is zero.
    Assembled { pages: usize, bytes: Vec<u8> },
    /// Split finished.
    Split { result: SplitResult, pages: usize },
    /// Cancellation was observed.
    Cancelled,
}

/// A unit of engine work, owning everything it reads.
pub type Work = Box<dyn FnOnce() -> Result<WorkOutput> + Send + 'static>;

/// Decides where engine work runs. The coordinator waits for the result.
pub trait Executor: Send + Sync {
    fn execute(&self, work: Work) -> Result<WorkOutput>;
}

/// Runs work on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, work: Work) -> Result<WorkOutput> {
        work()
    }
}

/// Runs each unit of work on a fresh, named OS thread.
#[derive(Debug, Clone)]
pub struct ThreadExecutor {
    name: String,
}

impl ThreadExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for ThreadExecutor {
    fn default() -> Self {
        Self::new("bindery-worker")
    }
}

impl Executor for ThreadExecutor {
    fn execute(&self, work: Work) -> Result<WorkOutput> {
        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(work)
            .map_err(|err| BinderyError::WorkerFailed(format!("failed to spawn worker: {}", err)))?;
        debug!(thread = %self.name, "Worker started");

        handle.join().map_err(|panic| {
            let message = panic_message(panic.as_ref());
            error!(thread = %self.name, %message, "Worker panicked");
            BinderyError::WorkerFailed(message)
        })?
    }
}

/// Strategy for a configured [`ExecutionMode`].
pub fn executor_for(mode: ExecutionMode) -> Box<dyn Executor> {
    match mode {
        ExecutionMode::Inline => Box::new(InlineExecutor),
        ExecutionMode::DedicatedThread => Box::new(ThreadExecutor::default()),
    }
}

/// Run work on tokio's blocking pool so async callers are not stalled by
/// PDF parsing.
pub async fn run_blocking(work: Work) -> Result<WorkOutput> {
    tokio::task::spawn_blocking(work).await.map_err(|err| {
        error!(error = %err, "Blocking worker failed");
        BinderyError::WorkerFailed(err.to_string())
    })?
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
