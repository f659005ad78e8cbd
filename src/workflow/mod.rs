//! The cancellable extract-then-download run.
//!
//! A [`Workflow`] owns its [`WorkflowState`] and reports to the caller only
//! through [`WorkflowEvent`]s and a read-only `watch` subscription. Work runs
//! as two units on a [`Worker`](crate::worker::Worker): the first extracts
//! fields and plays the simulated progress sequence, the second downloads the
//! image. Cancellation is a shared token checked between progress steps and
//! between chunk writes.

mod event;
mod state;

pub use event::{ExtractedFields, RunReport, SavedImage, WorkflowEvent};
pub use state::{InvalidTransition, WorkflowState};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::extractor::Extractor;
use crate::transfer::{Transfer, TransferJob, TransferOutcome};
use crate::worker::Spawner;

/// Extractor field names the workflow reads.
pub const TITLE_FIELD: &str = "title";
pub const AUTHOR_FIELD: &str = "author";
pub const IMAGE_URL_FIELD: &str = "image_url";

/// Message carried by every [`WorkflowEvent::Cancelled`].
pub const CANCELLED_MESSAGE: &str = "download stopped";

#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    /// Directory the image is written into; created on demand.
    pub output_dir: PathBuf,
    /// Percent increment between simulated progress events.
    pub progress_step_percent: u32,
    /// Wait before each simulated progress event.
    pub step_delay: Duration,
    /// Stand-in for a missing title or author.
    pub unknown_placeholder: String,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("img"),
            progress_step_percent: 10,
            step_delay: Duration::from_millis(100),
            unknown_placeholder: "Unknown".to_string(),
        }
    }
}

/// Fractions 0.0..=1.0 in `step_percent` increments.
fn progress_steps(step_percent: u32) -> impl Iterator<Item = f64> {
    (0..=100u32)
        .step_by(step_percent.clamp(1, 100) as usize)
        .map(|p| f64::from(p) / 100.0)
}

/// One cancellable run. Build a new workflow for every run.
pub struct Workflow {
    ctx: Arc<RunContext>,
}

struct RunContext {
    run_id: Uuid,
    settings: WorkflowSettings,
    extractor: Extractor,
    transfer: Transfer,
    spawner: Spawner,
    cancel: CancellationToken,
    state: watch::Sender<WorkflowState>,
    events: mpsc::UnboundedSender<WorkflowEvent>,
}

impl Workflow {
    /// Creates an idle workflow and the receiver its events arrive on.
    ///
    /// The extractor must define [`TITLE_FIELD`], [`AUTHOR_FIELD`] and
    /// [`IMAGE_URL_FIELD`]; any it lacks are treated as absent.
    pub fn new(
        settings: WorkflowSettings,
        extractor: Extractor,
        transfer: Transfer,
        spawner: Spawner,
    ) -> (Self, mpsc::UnboundedReceiver<WorkflowEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(WorkflowState::Idle);
        let ctx = RunContext {
            run_id: Uuid::new_v4(),
            settings,
            extractor,
            transfer,
            spawner,
            cancel: CancellationToken::new(),
            state,
            events,
        };
        (Self { ctx: Arc::new(ctx) }, rx)
    }

    pub fn run_id(&self) -> Uuid {
        self.ctx.run_id
    }

    pub fn state(&self) -> WorkflowState {
        *self.ctx.state.borrow()
    }

    /// Read-only view of state changes.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.ctx.state.subscribe()
    }

    /// Validates `raw_text`, moves to `Running` and queues the run.
    ///
    /// Empty input is rejected without leaving `Idle`.
    pub fn start(&self, raw_text: &str) -> Result<(), WorkflowError> {
        if raw_text.is_empty() {
            return Err(WorkflowError::EmptyInput);
        }

        let mut refused = None;
        self.ctx.state.send_if_modified(|state| {
            match state.transition(WorkflowState::Running) {
                Ok(next) => {
                    *state = next;
                    true
                }
                Err(e) => {
                    refused = Some(e.from);
                    false
                }
            }
        });
        if let Some(current) = refused {
            return Err(WorkflowError::AlreadyStarted(current));
        }

        let started_at = Utc::now();
        tracing::info!(run_id = %self.ctx.run_id, input_len = raw_text.len(), "workflow started");

        let unit = process(self.ctx.clone(), raw_text.to_owned(), started_at);
        if self.ctx.spawner.submit(unit).is_err() {
            let err = WorkflowError::WorkerUnavailable;
            self.ctx
                .finish(WorkflowState::Failed, WorkflowEvent::Failed(err.to_string()));
            return Err(err);
        }
        Ok(())
    }

    /// Requests cooperative cancellation.
    ///
    /// Returns `false` and does nothing unless the run is `Running`. The
    /// request takes effect at the next progress step or chunk boundary.
    pub fn cancel(&self) -> bool {
        if self.state() != WorkflowState::Running {
            return false;
        }
        tracing::info!(run_id = %self.ctx.run_id, "cancellation requested");
        self.ctx.cancel.cancel();
        true
    }
}

impl RunContext {
    fn emit(&self, event: WorkflowEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!(run_id = %self.run_id, "event receiver dropped");
        }
    }

    /// Moves to a terminal state, then reports it. State first, so a caller
    /// reacting to the event already sees the final state.
    fn finish(&self, to: WorkflowState, event: WorkflowEvent) {
        let mut refused = None;
        self.state.send_if_modified(|state| match state.transition(to) {
            Ok(next) => {
                *state = next;
                true
            }
            Err(e) => {
                refused = Some(e);
                false
            }
        });
        if let Some(e) = refused {
            tracing::warn!(run_id = %self.run_id, error = %e, "ignoring terminal event");
            return;
        }
        self.emit(event);
    }

    fn finish_cancelled(&self) {
        tracing::info!(run_id = %self.run_id, "workflow cancelled");
        self.finish(
            WorkflowState::Cancelled,
            WorkflowEvent::Cancelled(CANCELLED_MESSAGE.to_string()),
        );
    }

    fn finish_failed(&self, cause: impl std::fmt::Display) {
        tracing::error!(run_id = %self.run_id, error = %cause, "image download failed");
        self.finish(
            WorkflowState::Failed,
            WorkflowEvent::Failed(format!("image download failed: {cause}")),
        );
    }

    fn finish_completed(&self, report: RunReport) {
        tracing::info!(run_id = %self.run_id, duration_ms = report.duration_ms, "workflow completed");
        self.finish(WorkflowState::Completed, WorkflowEvent::Completed(report));
    }

    fn fields_from(&self, raw_text: &str) -> ExtractedFields {
        let result = self.extractor.extract(raw_text);
        let unknown = self.settings.unknown_placeholder.as_str();
        ExtractedFields {
            title: result.get_or(TITLE_FIELD, unknown).to_string(),
            author: result.get_or(AUTHOR_FIELD, unknown).to_string(),
            image_url: result.get(IMAGE_URL_FIELD).to_string(),
        }
    }
}

/// First unit: extract, play simulated progress, hand off to the download.
async fn process(ctx: Arc<RunContext>, raw_text: String, started_at: DateTime<Utc>) {
    let fields = ctx.fields_from(&raw_text);
    tracing::debug!(
        run_id = %ctx.run_id,
        title = %fields.title,
        author = %fields.author,
        image_url = %fields.image_url,
        "fields extracted"
    );

    for fraction in progress_steps(ctx.settings.progress_step_percent) {
        if ctx.cancel.is_cancelled() {
            ctx.finish_cancelled();
            return;
        }
        tokio::time::sleep(ctx.settings.step_delay).await;
        ctx.emit(WorkflowEvent::Progress(fraction));
    }
    if ctx.cancel.is_cancelled() {
        ctx.finish_cancelled();
        return;
    }

    ctx.emit(WorkflowEvent::FieldsExtracted {
        title: fields.title.clone(),
        author: fields.author.clone(),
    });

    if fields.image_url.is_empty() {
        tracing::info!(run_id = %ctx.run_id, "no image URL, skipping download");
        let report = RunReport::new(ctx.run_id, &fields, None, started_at);
        ctx.finish_completed(report);
        return;
    }

    let job = match TransferJob::new(&fields.image_url, &ctx.settings.output_dir) {
        Ok(job) => job,
        Err(e) => {
            ctx.finish_failed(e);
            return;
        }
    };

    let unit = download(ctx.clone(), job, fields, started_at);
    if let Err(e) = ctx.spawner.submit(unit) {
        ctx.finish_failed(e);
    }
}

/// Second unit: copy the image and report the terminal outcome.
async fn download(
    ctx: Arc<RunContext>,
    job: TransferJob,
    fields: ExtractedFields,
    started_at: DateTime<Utc>,
) {
    let run_id = ctx.run_id;
    let result = ctx
        .transfer
        .run(&job, &ctx.cancel, |bytes| {
            tracing::trace!(%run_id, bytes, "chunk written");
        })
        .await;

    match result {
        Ok(TransferOutcome::Completed { bytes }) => {
            let image = SavedImage {
                path: job.destination,
                bytes,
            };
            let report = RunReport::new(run_id, &fields, Some(image), started_at);
            ctx.finish_completed(report);
        }
        Ok(TransferOutcome::Cancelled { bytes }) => {
            tracing::info!(%run_id, bytes, destination = %job.destination.display(), "partial file kept");
            ctx.finish_cancelled();
        }
        Err(e) => ctx.finish_failed(e),
    }
}
