//! Orchestration of the four-stage remote analysis sequence.
//!
//! [`AnalysisPipeline`] is an explicit state machine driven by one spawned task
//! per job. At most one job runs at a time (single-flight); a trigger while a
//! job is active is a no-op. The embedding renderer observes progress through a
//! watch channel and only ever sees [`PipelineState`] values plus fixed
//! user-facing failure messages, never source-level error details.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::api::{AnalysisApi, JobHandle};
use super::extract::{decode_result, extract_first_json_object};
use crate::config::AnalysisConfig;
use crate::types::{AnalysisResult, Frame};

const COMPLETED_STATUS: &str = "completed";

/// Why an analysis job ended without a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Triggered without a displayable camera image.
    NoImage,
    /// Snapshot upload failed or returned no file identifier.
    UploadFailed,
    /// Job submission failed or returned no job identifier.
    JobStartFailed,
    /// The job did not complete within the polling deadline.
    Timeout,
    /// Result fetch, JSON extraction, or strict decode failed.
    ParseFailed,
    /// The job was cancelled by the caller.
    Cancelled,
}

impl FailureKind {
    /// Fixed user-facing message for the renderer.
    pub fn message(&self) -> &'static str {
        match self {
            FailureKind::NoImage => "no camera image to analyze",
            FailureKind::UploadFailed => "image upload failed",
            FailureKind::JobStartFailed => "analysis request failed",
            FailureKind::Timeout => "analysis timed out",
            FailureKind::ParseFailed => "could not read analysis result",
            FailureKind::Cancelled => "analysis cancelled",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Observable state of the pipeline.
///
/// Stages advance strictly in order; no stage is skipped or reordered. `Done`
/// and `Error` decay to `Idle` after a cool-down unless re-triggered first.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Idle,
    CapturingSnapshot,
    Uploading,
    StartingJob,
    Polling,
    FetchingResult,
    Done(AnalysisResult),
    Error(FailureKind),
}

impl PipelineState {
    /// Whether a new trigger is accepted in this state.
    pub fn is_ready(&self) -> bool {
        matches!(self, PipelineState::Idle | PipelineState::Done(_) | PipelineState::Error(_))
    }
}

/// One in-flight job: the snapshot plus identifiers accumulated per stage.
struct AnalysisJob {
    snapshot: Frame,
    file_id: Option<String>,
    handle: Option<JobHandle>,
}

/// Single-flight orchestrator over an [`AnalysisApi`].
pub struct AnalysisPipeline {
    api: Arc<dyn AnalysisApi>,
    config: AnalysisConfig,
    state_tx: Arc<watch::Sender<PipelineState>>,
    state_rx: watch::Receiver<PipelineState>,
    // Holds the active job's token; also the single-flight guard.
    active: Arc<Mutex<Option<CancellationToken>>>,
    // Bumped on every trigger, under the `active` lock. A job's pending
    // cool-down decay only fires while its own generation is still current,
    // so a stale timer never releases a later job's terminal state.
    generation: Arc<AtomicU64>,
}

impl AnalysisPipeline {
    pub fn new(api: Arc<dyn AnalysisApi>, config: AnalysisConfig) -> Self {
        let (state_tx, state_rx) = watch::channel(PipelineState::Idle);
        Self {
            api,
            config,
            state_tx: Arc::new(state_tx),
            state_rx,
            active: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start analyzing the given snapshot of the currently displayed image.
    ///
    /// Returns false without side effects when a job is already active
    /// (single-flight). `None` for the frame drives the state machine to
    /// `Error(NoImage)`.
    pub fn trigger(&self, frame: Option<Frame>) -> bool {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.state_rx.borrow().is_ready() {
            debug!("trigger ignored, a job is already active");
            return false;
        }

        let token = CancellationToken::new();
        *active = Some(token.clone());
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state_tx.send_replace(PipelineState::CapturingSnapshot);
        drop(active);

        info!("analysis job triggered");
        let api = Arc::clone(&self.api);
        let config = self.config.clone();
        let state_tx = Arc::clone(&self.state_tx);
        let slot = Arc::clone(&self.active);
        let generations = Arc::clone(&self.generation);
        tokio::spawn(run_job(api, config, state_tx, slot, generations, generation, frame, token));
        true
    }

    /// Abort the active job, if any, and return to `Idle` immediately.
    ///
    /// Cancellation drops the in-flight HTTP call, not just the logical wait.
    pub fn cancel(&self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = active.take() {
            info!("cancelling active analysis job");
            token.cancel();
        }
        self.state_tx.send_replace(PipelineState::Idle);
    }

    /// Current pipeline state.
    pub fn state(&self) -> PipelineState {
        self.state_rx.borrow().clone()
    }

    /// Pipeline state changes as a stream, freshest value first.
    pub fn state_updates(&self) -> WatchStream<PipelineState> {
        WatchStream::new(self.state_rx.clone())
    }
}

/// Job task body: drive the stages, publish the terminal state, then decay to
/// `Idle` after the cool-down unless a new job took over meanwhile.
async fn run_job(
    api: Arc<dyn AnalysisApi>,
    config: AnalysisConfig,
    state_tx: Arc<watch::Sender<PipelineState>>,
    active: Arc<Mutex<Option<CancellationToken>>>,
    generations: Arc<AtomicU64>,
    generation: u64,
    frame: Option<Frame>,
    token: CancellationToken,
) {
    let outcome = tokio::select! {
        _ = token.cancelled() => Err(FailureKind::Cancelled),
        outcome = drive_stages(api.as_ref(), &config, &state_tx, frame) => outcome,
    };

    if matches!(outcome, Err(FailureKind::Cancelled)) {
        // cancel() already cleared the slot and published Idle.
        debug!("analysis job cancelled");
        return;
    }

    {
        let mut slot = active.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    let terminal = match outcome {
        Ok(result) => {
            info!(species = %result.species_name, "analysis complete");
            PipelineState::Done(result)
        }
        Err(kind) => {
            warn!(failure = %kind, "analysis job failed");
            PipelineState::Error(kind)
        }
    };
    state_tx.send_replace(terminal);

    // Cool-down, then release the terminal state. The lock serializes this
    // with trigger(): a concurrent trigger either bumps the generation first
    // (decay skipped) or runs after the decay and sees Idle.
    tokio::time::sleep(config.cooldown).await;
    let _guard = active.lock().unwrap_or_else(PoisonError::into_inner);
    if generations.load(Ordering::SeqCst) == generation
        && !matches!(*state_tx.borrow(), PipelineState::Idle)
    {
        trace!("terminal state decayed to idle");
        state_tx.send_replace(PipelineState::Idle);
    }
}

/// The stage sequence proper. Maps every stage failure to its caller-visible
/// [`FailureKind`]; underlying errors are logged here and go no further.
async fn drive_stages(
    api: &dyn AnalysisApi,
    config: &AnalysisConfig,
    state_tx: &watch::Sender<PipelineState>,
    frame: Option<Frame>,
) -> Result<AnalysisResult, FailureKind> {
    // CapturingSnapshot was published by trigger().
    let Some(snapshot) = frame else {
        return Err(FailureKind::NoImage);
    };
    debug!(len = snapshot.len(), "snapshot captured");
    let mut job = AnalysisJob { snapshot, file_id: None, handle: None };

    // Uploading and StartingJob share one wall-clock budget.
    let budget_start = Instant::now();

    state_tx.send_replace(PipelineState::Uploading);
    let file_id = match stage_call(
        config.overall_budget.saturating_sub(budget_start.elapsed()),
        api.upload_image(job.snapshot.bytes()),
    )
    .await
    {
        Ok(id) => job.file_id.insert(id),
        Err(e) => {
            warn!(error = %e, "upload stage failed");
            return Err(FailureKind::UploadFailed);
        }
    };

    state_tx.send_replace(PipelineState::StartingJob);
    let handle = match stage_call(
        config.overall_budget.saturating_sub(budget_start.elapsed()),
        api.start_job(file_id, &config.prompt),
    )
    .await
    {
        Ok(handle) => job.handle.insert(handle),
        Err(e) => {
            warn!(error = %e, "job start stage failed");
            return Err(FailureKind::JobStartFailed);
        }
    };

    // Polling runs against its own deadline, measured from job start.
    state_tx.send_replace(PipelineState::Polling);
    let poll_start = Instant::now();
    loop {
        if poll_start.elapsed() >= config.poll_timeout {
            return Err(FailureKind::Timeout);
        }
        match api.poll_status(handle).await {
            Ok(status) if status == COMPLETED_STATUS => break,
            Ok(status) => trace!(%status, "job still running"),
            // A failed poll is not fatal; the next interval retries.
            Err(e) => warn!(error = %e, "status poll failed"),
        }
        tokio::time::sleep(config.poll_interval).await;
    }

    state_tx.send_replace(PipelineState::FetchingResult);
    let raw = match api.fetch_result(handle).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "result fetch failed");
            return Err(FailureKind::ParseFailed);
        }
    };
    let Some(span) = extract_first_json_object(&raw) else {
        warn!("no JSON object found in analysis answer");
        return Err(FailureKind::ParseFailed);
    };
    match decode_result(span) {
        Ok(result) => Ok(result),
        Err(e) => {
            warn!(error = %e, "result decode failed");
            Err(FailureKind::ParseFailed)
        }
    }
}

/// Run one remote call under what remains of the shared budget.
async fn stage_call<T>(
    remaining: Duration,
    call: impl Future<Output = crate::error::Result<T>>,
) -> crate::error::Result<T> {
    match tokio::time::timeout(remaining, call).await {
        Ok(result) => result,
        Err(_) => Err(crate::error::VisionError::Timeout { duration: remaining }),
    }
}
