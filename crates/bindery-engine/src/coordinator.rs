// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job coordinator: owns the input registry and configuration, validates a
// job before any work starts, runs the engine through the configured
// execution strategy, and performs the terminal action.
//
// One job runs at a time. A job that passed its preconditions always ends
// in Completed, Cancelled or Failed, and the registry is cleared afterwards
// whatever the result.

use std::sync::Arc;

use bindery_core::error::{BinderyError, Result};
use bindery_core::{
    EngineConfig, JobOutcome, JobRecord, JobStatus, Position, SplitRequest, TerminalAction,
};
use tracing::{Span, error, info, info_span, warn};

use crate::assembly::{self, Assembly};
use crate::executor::{self, Executor, Work, WorkOutput};
use crate::progress::{CancelToken, NoProgress, ProgressSink};
use crate::registry::InputRegistry;
use crate::save_target::SaveTarget;
use crate::split::{self, Split};

/// Front door of the engine.
///
/// Inputs are added with [`Coordinator::add_image`],
/// [`Coordinator::add_document`] or
/// [`Coordinator::add_single_document_with_rotation`], then one of
/// [`Coordinator::save`], [`Coordinator::return_bytes`] or
/// [`Coordinator::split`] runs the job.
pub struct Coordinator {
    config: EngineConfig,
    registry: InputRegistry,
    status: JobStatus,
    executor: Box<dyn Executor>,
    progress: Arc<dyn ProgressSink>,
    save_target: Option<Box<dyn SaveTarget>>,
    cancel: CancelToken,
    /// Record of the job in flight, if any.
    current: Option<JobRecord>,
    last_job: Option<JobRecord>,
}

impl Coordinator {
    /// A coordinator whose execution strategy follows `config.execution`.
    ///
    /// With the `dialog` feature, saves ask the user for a path; otherwise a
    /// save target must be set with [`Coordinator::with_save_target`].
    pub fn new(config: EngineConfig) -> Self {
        let executor = executor::executor_for(config.execution);
        Self {
            config,
            registry: InputRegistry::new(),
            status: JobStatus::Idle,
            executor,
            progress: Arc::new(NoProgress),
            save_target: default_save_target(),
            cancel: CancelToken::new(),
            current: None,
            last_job: None,
        }
    }

    pub fn with_executor(mut self, executor: impl Executor + 'static) -> Self {
        self.executor = Box::new(executor);
        self
    }

    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Arc::new(sink);
        self
    }

    pub fn with_save_target(mut self, target: impl SaveTarget + 'static) -> Self {
        self.save_target = Some(Box::new(target));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Inputs queued for the next job.
    pub fn registry(&self) -> &InputRegistry {
        &self.registry
    }

    /// The most recent job that got past its preconditions.
    pub fn last_job(&self) -> Option<&JobRecord> {
        self.last_job.as_ref()
    }

    /// Token that cancels the running job at its next checkpoint.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    // -- Inputs --------------------------------------------------------------

    pub fn add_image(&mut self, bytes: Vec<u8>, target_height: Option<u32>) -> Result<Position> {
        self.ensure_idle()?;
        self.registry.add_image(bytes, target_height)
    }

    pub fn add_document(&mut self, bytes: Vec<u8>) -> Result<Position> {
        self.ensure_idle()?;
        self.registry.add_document(bytes)
    }

    pub fn add_single_document_with_rotation(
        &mut self,
        bytes: Vec<u8>,
        rotation_code: i64,
    ) -> Result<Position> {
        self.ensure_idle()?;
        self.registry
            .add_single_document_with_rotation(bytes, rotation_code)
    }

    /// Page count of a PDF. Touches no coordinator state.
    pub fn page_count(bytes: &[u8]) -> Result<usize> {
        bindery_document::page_count(bytes)
    }

    // -- Terminal actions ----------------------------------------------------

    /// Assemble and write the result to a path chosen by the save target.
    pub fn save(&mut self) -> Result<JobOutcome> {
        self.run(TerminalAction::Save)
    }

    /// Assemble and return the serialised document.
    pub fn return_bytes(&mut self) -> Result<JobOutcome> {
        self.run(TerminalAction::ReturnBytes)
    }

    /// Split the document at position 1 by a 1-based inclusive page range.
    pub fn split(&mut self, start_page: u32, end_page: u32) -> Result<JobOutcome> {
        self.run(TerminalAction::Split(SplitRequest::new(start_page, end_page)))
    }

    /// Run a job on the configured execution strategy and wait for it.
    pub fn run(&mut self, action: TerminalAction) -> Result<JobOutcome> {
        let (work, span) = self.start(action)?;
        let result = span.in_scope(|| self.executor.execute(work));
        span.in_scope(|| self.finish(action, result))
    }

    /// Run a job on tokio's blocking pool.
    ///
    /// Dropping the returned future after it has started leaves the
    /// coordinator `Running`; later jobs are refused with `JobInProgress`.
    pub async fn run_async(&mut self, action: TerminalAction) -> Result<JobOutcome> {
        let (work, span) = self.start(action)?;
        let result = executor::run_blocking(work).await;
        span.in_scope(|| self.finish(action, result))
    }

    // -- Job lifecycle -------------------------------------------------------

    fn ensure_idle(&self) -> Result<()> {
        if self.status == JobStatus::Running {
            return Err(BinderyError::JobInProgress);
        }
        Ok(())
    }

    /// Check preconditions, then hand the registry to a unit of work.
    /// Nothing changes when a check fails.
    fn start(&mut self, action: TerminalAction) -> Result<(Work, Span)> {
        self.ensure_idle()?;
        self.check_preconditions(action)?;

        let registry = std::mem::take(&mut self.registry);
        self.cancel.reset();
        self.status = JobStatus::Running;
        let record = JobRecord::new(action);
        let span = info_span!("job", job_id = %record.id);
        span.in_scope(|| info!(?action, positions = registry.len(), "Job started"));
        self.current = Some(record);

        let work = self.build_work(action, registry, span.clone());
        Ok((work, span))
    }

    fn check_preconditions(&self, action: TerminalAction) -> Result<()> {
        match action {
            TerminalAction::Save if self.save_target.is_none() => Err(
                BinderyError::InvalidJobSetup("no save target configured".to_string()),
            ),
            TerminalAction::Split(request) => {
                let document = self.registry.document_at(Position::FIRST).ok_or_else(|| {
                    BinderyError::InvalidJobSetup(
                        "split needs a document at position 1".to_string(),
                    )
                })?;
                let page_count = bindery_document::page_count(document)
                    .map_err(|err| err.at_position(Position::FIRST))?;
                request.validate(page_count)
            }
            _ => Ok(()),
        }
    }

    fn build_work(&self, action: TerminalAction, registry: InputRegistry, span: Span) -> Work {
        let sink = Arc::clone(&self.progress);
        let cancel = self.cancel.clone();
        match action {
            TerminalAction::Split(request) => {
                let document = registry.into_document_at(Position::FIRST).unwrap_or_default();
                Box::new(move || -> Result<WorkOutput> {
                    let _entered = span.enter();
                    match split::split(&document, request, sink.as_ref(), &cancel)
                        .map_err(|err| err.at_position(Position::FIRST))?
                    {
                        Split::Finished { result, pages, .. } => {
                            Ok(WorkOutput::Split { result, pages })
                        }
                        Split::Cancelled { .. } => Ok(WorkOutput::Cancelled),
                    }
                })
            }
            TerminalAction::Save | TerminalAction::ReturnBytes => {
                let config = self.config.clone();
                Box::new(move || -> Result<WorkOutput> {
                    let _entered = span.enter();
                    match assembly::assemble(&registry, &config, sink.as_ref(), &cancel)? {
                        Assembly::Finished { pages: 0, .. } => Ok(WorkOutput::Assembled {
                            pages: 0,
                            bytes: Vec::new(),
                        }),
                        Assembly::Finished {
                            document, pages, ..
                        } => Ok(WorkOutput::Assembled {
                            pages,
                            bytes: document.into_bytes()?,
                        }),
                        Assembly::Cancelled { .. } => Ok(WorkOutput::Cancelled),
                    }
                })
            }
        }
    }

    /// Perform the terminal action and close the job record.
    fn finish(&mut self, action: TerminalAction, result: Result<WorkOutput>) -> Result<JobOutcome> {
        let mut record = self.current.take().unwrap_or_else(|| JobRecord::new(action));

        let outcome = result.and_then(|output| self.complete(action, output, &mut record));
        let status = match &outcome {
            Ok(JobOutcome::Cancelled) => JobStatus::Cancelled,
            Ok(_) => JobStatus::Completed,
            Err(err) => {
                error!(error = %err, "Job failed");
                record.error_message = Some(err.to_string());
                JobStatus::Failed
            }
        };
        record.finish(status);
        info!(?status, pages = record.pages, "Job finished");

        self.status = status;
        self.last_job = Some(record);
        outcome
    }

    fn complete(
        &self,
        action: TerminalAction,
        output: WorkOutput,
        record: &mut JobRecord,
    ) -> Result<JobOutcome> {
        match (action, output) {
            (_, WorkOutput::Cancelled) => {
                info!("Job cancelled; nothing written");
                Ok(JobOutcome::Cancelled)
            }
            (_, WorkOutput::Assembled { pages: 0, .. }) => {
                warn!("Assembly produced no pages; skipping terminal action");
                Ok(JobOutcome::Empty)
            }
            (TerminalAction::Save, WorkOutput::Assembled { pages, bytes }) => {
                record.pages = pages;
                self.persist(bytes)
            }
            (TerminalAction::ReturnBytes, WorkOutput::Assembled { pages, bytes }) => {
                record.pages = pages;
                Ok(JobOutcome::Bytes(bytes))
            }
            (TerminalAction::Split(_), WorkOutput::Split { result, pages }) => {
                record.pages = pages;
                Ok(JobOutcome::Split(result))
            }
            (action, _) => Err(BinderyError::WorkerFailed(format!(
                "engine output does not match {action:?}"
            ))),
        }
    }

    fn persist(&self, bytes: Vec<u8>) -> Result<JobOutcome> {
        let Some(target) = self.save_target.as_ref() else {
            return Err(BinderyError::InvalidJobSetup(
                "no save target configured".to_string(),
            ));
        };
        let Some(path) = target.choose_path() else {
            info!("Save declined; nothing written");
            return Ok(JobOutcome::Saved { path: None });
        };
        std::fs::write(&path, &bytes).map_err(|source| BinderyError::PersistenceFailure {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), bytes_len = bytes.len(), "Document saved");
        Ok(JobOutcome::Saved { path: Some(path) })
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(feature = "dialog")]
fn default_save_target() -> Option<Box<dyn SaveTarget>> {
    Some(Box::new(crate::save_target::SaveDialog::default()))
}

#[cfg(not(feature = "dialog"))]
fn default_save_target() -> Option<Box<dyn SaveTarget>> {
    None
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use bindery_core::ExecutionMode;
    use bindery_document::testing;

    use super::*;
    use crate::executor::InlineExecutor;
    use crate::progress::{AsyncChannelProgress, ChannelProgress};
    use crate::save_target::FixedPath;

    struct Declined;

    impl SaveTarget for Declined {
        fn choose_path(&self) -> Option<PathBuf> {
            None
        }
    }

    fn inline(config: EngineConfig) -> Coordinator {
        Coordinator::new(config).with_executor(InlineExecutor)
    }

    fn recording(coordinator: Coordinator) -> (Coordinator, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |percent: u8| seen.lock().unwrap().push(percent)
        };
        (coordinator.with_progress(sink), seen)
    }

    fn bytes(outcome: JobOutcome) -> Vec<u8> {
        match outcome {
            JobOutcome::Bytes(bytes) => bytes,
            other => panic!("expected bytes, got {other:?}"),
        }
    }

    #[test]
    fn image_and_document_with_page_numbers() {
        let (mut coordinator, seen) = recording(inline(EngineConfig::with_page_numbers(true)));
        coordinator.add_image(testing::png_image(4, 3), None).unwrap();
        coordinator.add_document(testing::pdf_with_pages(2)).unwrap();

        let output = bytes(coordinator.return_bytes().unwrap());

        let texts = testing::page_texts(&output);
        assert_eq!(texts.len(), 3);
        assert_eq!(
            texts.iter().map(|page| page.last().unwrap().as_str()).collect::<Vec<_>>(),
            vec!["Page 1", "Page 2", "Page 3"]
        );
        assert_eq!(*seen.lock().unwrap(), vec![50, 100]);
        assert_eq!(coordinator.status(), JobStatus::Completed);
        assert_eq!(coordinator.last_job().unwrap().pages, 3);
    }

    #[test]
    fn dedicated_thread_gives_the_same_document() {
        let mut config = EngineConfig::with_page_numbers(true);
        config.execution = ExecutionMode::DedicatedThread;
        let (tx, rx) = std::sync::mpsc::channel();
        let mut coordinator = Coordinator::new(config).with_progress(ChannelProgress(tx));
        coordinator.add_document(testing::labelled_pdf("A", 2)).unwrap();
        coordinator.add_document(testing::labelled_pdf("B", 1)).unwrap();

        let output = bytes(coordinator.return_bytes().unwrap());

        assert_eq!(testing::page_labels(&output), vec!["A 1", "A 2", "B 1"]);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![50, 100]);
    }

    #[test]
    fn registry_is_cleared_after_a_job() {
        let mut coordinator = inline(EngineConfig::default());
        coordinator.add_document(testing::pdf_with_pages(1)).unwrap();
        coordinator.return_bytes().unwrap();

        assert!(coordinator.registry().is_empty());
        let position = coordinator.add_document(testing::pdf_with_pages(1)).unwrap();
        assert_eq!(position, Position::FIRST);
    }

    #[test]
    fn save_writes_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        let mut coordinator =
            inline(EngineConfig::default()).with_save_target(FixedPath(path.clone()));
        coordinator.add_document(testing::pdf_with_pages(3)).unwrap();

        let outcome = coordinator.save().unwrap();

        assert_eq!(outcome, JobOutcome::Saved { path: Some(path.clone()) });
        let written = std::fs::read(&path).unwrap();
        assert_eq!(Coordinator::page_count(&written).unwrap(), 3);
    }

    #[test]
    fn declined_save_writes_nothing() {
        let mut coordinator = inline(EngineConfig::default()).with_save_target(Declined);
        coordinator.add_document(testing::pdf_with_pages(1)).unwrap();

        assert_eq!(coordinator.save().unwrap(), JobOutcome::Saved { path: None });
        assert_eq!(coordinator.status(), JobStatus::Completed);
    }

    #[test]
    fn unwritable_path_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.pdf");
        let mut coordinator = inline(EngineConfig::default()).with_save_target(FixedPath(path));
        coordinator.add_document(testing::pdf_with_pages(1)).unwrap();

        let err = coordinator.save().unwrap_err();

        assert!(matches!(err, BinderyError::PersistenceFailure { .. }));
        assert_eq!(coordinator.status(), JobStatus::Failed);
        assert!(coordinator.last_job().unwrap().error_message.is_some());
        assert!(coordinator.registry().is_empty());
    }

    #[test]
    #[cfg(not(feature = "dialog"))]
    fn save_without_a_target_is_refused_up_front() {
        let mut coordinator = inline(EngineConfig::default());
        coordinator.add_document(testing::pdf_with_pages(1)).unwrap();

        let err = coordinator.save().unwrap_err();

        assert!(matches!(err, BinderyError::InvalidJobSetup(_)));
        assert_eq!(coordinator.status(), JobStatus::Idle);
        assert_eq!(coordinator.registry().len(), 1);
    }

    #[test]
    fn split_cuts_the_range_out() {
        let (mut coordinator, seen) = recording(inline(EngineConfig::default()));
        coordinator.add_document(testing::pdf_with_pages(5)).unwrap();

        let JobOutcome::Split(result) = coordinator.split(2, 3).unwrap() else {
            panic!("expected a split outcome");
        };

        assert_eq!(
            testing::page_labels(&result.remainder),
            vec!["Source page 1", "Source page 4", "Source page 5"]
        );
        assert_eq!(
            testing::page_labels(&result.extracted),
            vec!["Source page 2", "Source page 3"]
        );
        assert_eq!(*seen.lock().unwrap(), vec![50, 100]);
        assert_eq!(coordinator.last_job().unwrap().pages, 5);
    }

    #[test]
    fn invalid_split_is_rejected_before_any_work() {
        let (mut coordinator, seen) = recording(inline(EngineConfig::default()));
        coordinator.add_document(testing::pdf_with_pages(5)).unwrap();

        for (start, end) in [(4, 2), (0, 1), (5, 6)] {
            let err = coordinator.split(start, end).unwrap_err();
            assert!(err.is_precondition(), "({start}, {end}) gave {err:?}");
        }

        assert_eq!(coordinator.status(), JobStatus::Idle);
        assert!(coordinator.last_job().is_none());
        assert_eq!(coordinator.registry().len(), 1);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn split_needs_a_document_at_position_one() {
        let mut coordinator = inline(EngineConfig::default());
        coordinator.add_image(testing::png_image(2, 2), None).unwrap();

        let err = coordinator.split(1, 1).unwrap_err();

        assert!(matches!(err, BinderyError::InvalidJobSetup(_)));
        assert_eq!(coordinator.registry().len(), 1);
    }

    #[test]
    fn corrupt_split_source_is_rejected_before_any_work() {
        let mut coordinator = inline(EngineConfig::default());
        coordinator.add_document(b"%PDF-1.7 truncated".to_vec()).unwrap();

        let err = coordinator.split(1, 1).unwrap_err();

        assert!(matches!(
            err,
            BinderyError::CorruptInput {
                position: Position(1),
                ..
            }
        ));
        assert_eq!(coordinator.status(), JobStatus::Idle);
        assert!(coordinator.last_job().is_none());
        assert_eq!(coordinator.registry().len(), 1);
    }

    #[test]
    fn cancellation_after_two_of_five_positions() {
        let coordinator = inline(EngineConfig::default());
        let cancel = coordinator.cancel_token();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |percent: u8| {
                seen.lock().unwrap().push(percent);
                if percent == 40 {
                    cancel.cancel();
                }
            }
        };
        let mut coordinator = coordinator.with_progress(sink);
        for _ in 0..5 {
            coordinator.add_document(testing::pdf_with_pages(1)).unwrap();
        }

        assert_eq!(coordinator.return_bytes().unwrap(), JobOutcome::Cancelled);
        assert_eq!(*seen.lock().unwrap(), vec![20, 40]);
        assert_eq!(coordinator.status(), JobStatus::Cancelled);
        assert!(coordinator.registry().is_empty());
    }

    #[test]
    fn stale_cancellation_does_not_leak_into_the_next_job() {
        let mut coordinator = inline(EngineConfig::default());
        coordinator.cancel_token().cancel();
        coordinator.add_document(testing::pdf_with_pages(2)).unwrap();

        let output = bytes(coordinator.return_bytes().unwrap());
        assert_eq!(Coordinator::page_count(&output).unwrap(), 2);
    }

    #[test]
    fn empty_job_skips_the_terminal_action() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.pdf");
        let mut coordinator =
            inline(EngineConfig::default()).with_save_target(FixedPath(path.clone()));

        assert_eq!(coordinator.save().unwrap(), JobOutcome::Empty);
        assert!(!path.exists());
        assert_eq!(coordinator.last_job().unwrap().pages, 0);
    }

    #[test]
    fn corrupt_input_fails_with_its_position() {
        let mut coordinator = inline(EngineConfig::default());
        coordinator.add_document(testing::pdf_with_pages(1)).unwrap();
        coordinator.add_document(b"%PDF-1.7 truncated".to_vec()).unwrap();

        let err = coordinator.return_bytes().unwrap_err();

        assert!(matches!(
            err,
            BinderyError::CorruptInput {
                position: Position(2),
                ..
            }
        ));
        assert_eq!(coordinator.status(), JobStatus::Failed);
        assert!(coordinator.registry().is_empty());
    }

    #[test]
    fn rotated_single_document() {
        let mut coordinator = inline(EngineConfig::default());
        coordinator
            .add_single_document_with_rotation(testing::pdf_with_pages(2), 6)
            .unwrap();
        assert!(coordinator.add_document(testing::pdf_with_pages(1)).is_err());

        let output = bytes(coordinator.return_bytes().unwrap());
        assert_eq!(testing::page_rotations(&output), vec![Some(90), Some(90)]);

        // The next job starts without rotation.
        coordinator.add_document(testing::pdf_with_pages(1)).unwrap();
        let output = bytes(coordinator.return_bytes().unwrap());
        assert_eq!(testing::page_rotations(&output), vec![None]);
    }

    #[test]
    fn new_work_is_refused_while_running() {
        let mut coordinator = inline(EngineConfig::default());
        coordinator.add_document(testing::pdf_with_pages(1)).unwrap();
        coordinator.status = JobStatus::Running;

        assert!(matches!(
            coordinator.return_bytes(),
            Err(BinderyError::JobInProgress)
        ));
        assert!(matches!(
            coordinator.add_document(testing::pdf_with_pages(1)),
            Err(BinderyError::JobInProgress)
        ));
        assert_eq!(coordinator.registry().len(), 1);
    }

    #[tokio::test]
    async fn async_run_reports_progress_over_a_channel() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut coordinator =
            Coordinator::new(EngineConfig::default()).with_progress(AsyncChannelProgress(tx));
        coordinator.add_document(testing::pdf_with_pages(2)).unwrap();
        coordinator.add_image(testing::png_image(3, 3), Some(80)).unwrap();

        let output = bytes(coordinator.run_async(TerminalAction::ReturnBytes).await.unwrap());

        assert_eq!(Coordinator::page_count(&output).unwrap(), 3);
        assert_eq!(rx.recv().await, Some(50));
        assert_eq!(rx.recv().await, Some(100));
        assert_eq!(coordinator.status(), JobStatus::Completed);
    }
}
