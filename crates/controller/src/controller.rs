//! The job controller: one generation job at a time, from submission to a
//! terminal state.
//!
//! Every run executes as its own Tokio task (see [`crate::run`]) owning a
//! [`CancellationToken`]. The controller keeps the live [`GenerationJob`]
//! behind a mutex and only lets a run touch it while that run's token is
//! still live, so a superseded or cancelled run can never mutate or report
//! on a newer job.
//!
//! Callback delivery happens under a re-entrant delivery gate that
//! [`JobController::cancel`] and [`JobController::start`] also take. Once
//! either returns, no callback for the previous job is running or will run.

use std::cell::RefCell;
use std::sync::Arc;

use genjob_backend::{build_backend, SharedBackend};
use genjob_core::{
    ConfigError, ControllerConfig, GenerationJob, JobError, JobHandle, JobInput, JobResult,
    JobStatus, JobWarning, ProgressEstimator,
};
use parking_lot::{Mutex, ReentrantMutex};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::callbacks::{dispatch, Callbacks, CompleteFn, ErrorFn, ProgressFn, WarningFn};
use crate::events::{JobEvent, EVENT_CHANNEL_CAPACITY};
use crate::materializer::ResultMaterializer;
use crate::run::JobRun;
use crate::sink::PersistenceSink;

/// Something a run reports after changing the job.
pub(crate) enum Notice {
    Submitted(JobHandle),
    Progress { percent: u8, attempt: u32 },
    Warning(JobWarning),
    Complete(JobResult),
    Error(JobError),
}

/// What `wait()` watches: the job's status, and whether its run has
/// finished all work for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Phase {
    status: JobStatus,
    settled: bool,
}

impl Phase {
    /// A completed job settles only once its result is materialized.
    fn of(status: JobStatus) -> Self {
        Self {
            status,
            settled: status.is_terminal() && status != JobStatus::Completed,
        }
    }
}

struct State {
    job: GenerationJob,
    /// Token of the run that owns `job`, if any.
    run: Option<CancellationToken>,
}

/// State shared between the controller handle and its run tasks.
pub(crate) struct Shared {
    state: Mutex<State>,
    gate: ReentrantMutex<RefCell<Callbacks>>,
    events: broadcast::Sender<JobEvent>,
    phase: watch::Sender<Phase>,
    pub(crate) backend: SharedBackend,
    pub(crate) materializer: ResultMaterializer,
}

impl Shared {
    /// Mutate the job owned by `run` and deliver the notices it produced.
    ///
    /// Returns `false` without touching anything when `run` is no longer
    /// live or `mutate` declines. Delivery stops as soon as the run is
    /// cancelled, including from inside a callback.
    pub(crate) fn apply<F>(&self, run: &CancellationToken, mutate: F) -> bool
    where
        F: FnOnce(&mut GenerationJob, &mut Vec<Notice>) -> bool,
    {
        let gate = self.gate.lock();
        let mut notices = Vec::new();
        let job_id = {
            let mut state = self.state.lock();
            if run.is_cancelled() || !mutate(&mut state.job, &mut notices) {
                return false;
            }
            self.phase.send_replace(Phase::of(state.job.status));
            state.job.id
        };
        for notice in notices {
            if run.is_cancelled() {
                break;
            }
            self.deliver(&gate, run, job_id, notice);
        }
        true
    }

    /// Mutate job `job_id` if it is still the current one, without
    /// delivering anything.
    pub(crate) fn update_job(&self, job_id: Uuid, mutate: impl FnOnce(&mut GenerationJob)) {
        let mut state = self.state.lock();
        if state.job.id == job_id {
            mutate(&mut state.job);
        }
    }

    /// Mark job `job_id` as settled once its run has nothing left to do.
    ///
    /// Unlike [`apply`](Self::apply) this ignores cancellation: a completed
    /// job stays completed, and `wait()` must still resolve.
    pub(crate) fn settle(&self, job_id: Uuid) {
        let state = self.state.lock();
        if state.job.id == job_id {
            self.phase.send_replace(Phase {
                status: state.job.status,
                settled: true,
            });
        }
    }

    fn deliver(
        &self,
        callbacks: &RefCell<Callbacks>,
        run: &CancellationToken,
        job_id: Uuid,
        notice: Notice,
    ) {
        let live = || !run.is_cancelled();
        match notice {
            Notice::Submitted(handle) => self.publish(JobEvent::Submitted { job_id, handle }),
            Notice::Progress { percent, attempt } => {
                self.publish(JobEvent::Progress {
                    job_id,
                    percent,
                    attempt,
                });
                dispatch(callbacks, Callbacks::progress, live, |cb: &mut ProgressFn| {
                    cb(percent)
                });
            }
            Notice::Warning(warning) => {
                self.publish(JobEvent::Warning {
                    job_id,
                    warning: warning.clone(),
                });
                dispatch(callbacks, Callbacks::warning, live, |cb: &mut WarningFn| {
                    cb(&warning)
                });
            }
            Notice::Complete(result) => {
                self.publish(JobEvent::Completed {
                    job_id,
                    result: result.clone(),
                });
                dispatch(callbacks, Callbacks::complete, live, |cb: &mut CompleteFn| {
                    cb(&result)
                });
            }
            Notice::Error(error) => {
                self.publish(JobEvent::Failed {
                    job_id,
                    error: error.clone(),
                });
                dispatch(callbacks, Callbacks::error, live, |cb: &mut ErrorFn| {
                    cb(&error)
                });
            }
        }
    }

    fn publish(&self, event: JobEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Cancel the current run and move its job to `Cancelled` if it is
    /// still in flight. Caller holds the gate.
    fn retire(&self, state: &mut State, reason: &'static str) {
        if let Some(run) = state.run.take() {
            run.cancel();
        }
        if !state.job.cancel() {
            return;
        }
        let job_id = state.job.id;
        tracing::info!(job_id = %job_id, reason, "Job cancelled");
        self.phase.send_replace(Phase::of(JobStatus::Cancelled));
        self.publish(JobEvent::Cancelled { job_id });
        if let Some(handle) = state.job.handle.clone() {
            self.cancel_remote(job_id, handle);
        }
    }

    /// Ask the backend to drop `handle`. Best effort: failures are logged.
    pub(crate) fn cancel_remote(&self, job_id: Uuid, handle: JobHandle) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(
                job_id = %job_id,
                handle = %handle,
                "No runtime, skipping remote cancel",
            );
            return;
        };
        let backend = Arc::clone(&self.backend);
        runtime.spawn(async move {
            if let Err(e) = backend.cancel(&handle).await {
                tracing::warn!(
                    job_id = %job_id,
                    handle = %handle,
                    error = %e,
                    "Remote cancel failed",
                );
            }
        });
    }
}

/// Drives generation jobs against a [`JobBackend`](genjob_backend::JobBackend).
///
/// At most one job is active at a time; starting a new one cancels the
/// previous. Callbacks are registered on the controller and apply to every
/// job it runs. Dropping the controller cancels the active job.
pub struct JobController {
    shared: Arc<Shared>,
    config: ControllerConfig,
    estimator: ProgressEstimator,
}

impl JobController {
    pub fn new(
        config: ControllerConfig,
        backend: SharedBackend,
        materializer: ResultMaterializer,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let estimator = config.estimator()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (phase, _) = watch::channel(Phase::of(JobStatus::Idle));

        tracing::info!(
            backend = backend.name(),
            poll_interval_ms = config.poll_interval.as_millis() as u64,
            max_attempts = config.max_attempts,
            "Job controller created",
        );

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    job: GenerationJob::idle(),
                    run: None,
                }),
                gate: ReentrantMutex::new(RefCell::new(Callbacks::default())),
                events,
                phase,
                backend,
                materializer,
            }),
            config,
            estimator,
        })
    }

    /// Build the backend selected by `config.backend` and record results
    /// into `sink`.
    pub fn from_config(
        config: ControllerConfig,
        sink: Arc<dyn PersistenceSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let backend = build_backend(&config.backend);
        Self::new(config, backend, ResultMaterializer::new(sink))
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &str {
        self.shared.backend.name()
    }

    /// Validate `input` and start a new job, cancelling the active one.
    ///
    /// Invalid input is rejected synchronously: the current job is left
    /// alone, nothing reaches the backend and no callback fires.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, input: JobInput) -> Result<Uuid, JobError> {
        if let Err(e) = input.validate() {
            tracing::warn!(tool = %input.tool, error = %e, "Rejected job input");
            return Err(e);
        }

        let id = Uuid::now_v7();
        let run = CancellationToken::new();
        {
            let _gate = self.shared.gate.lock();
            let mut state = self.shared.state.lock();
            self.shared.retire(&mut state, "superseded");
            state.job = GenerationJob::submitting(id, input.tool.clone(), input.label.clone());
            state.run = Some(run.clone());
            self.shared
                .phase
                .send_replace(Phase::of(JobStatus::Submitting));
        }

        tracing::info!(job_id = %id, tool = %input.tool, "Job started");
        let span = tracing::info_span!("job", job_id = %id);
        let job = JobRun::new(
            id,
            input,
            run,
            Arc::clone(&self.shared),
            self.estimator,
            &self.config,
        );
        tokio::spawn(job.drive().instrument(span));
        Ok(id)
    }

    /// Cancel the active job.
    ///
    /// Idempotent. A job that already reached a terminal state keeps it,
    /// but no further callback fires for it after this returns.
    pub fn cancel(&self) {
        let _gate = self.shared.gate.lock();
        let mut state = self.shared.state.lock();
        self.shared.retire(&mut state, "cancelled by caller");
    }

    /// Subscribe to progress updates (0-100, never decreasing per job).
    pub fn on_progress(&self, callback: impl FnMut(u8) + Send + 'static) {
        let gate = self.shared.gate.lock();
        gate.borrow_mut().push_progress(Box::new(callback));
    }

    /// Subscribe to successful completion. Fires at most once per job.
    pub fn on_complete(&self, callback: impl FnMut(&JobResult) + Send + 'static) {
        let gate = self.shared.gate.lock();
        gate.borrow_mut().push_complete(Box::new(callback));
    }

    /// Subscribe to job failure and timeout. Fires at most once per job.
    pub fn on_error(&self, callback: impl FnMut(&JobError) + Send + 'static) {
        let gate = self.shared.gate.lock();
        gate.borrow_mut().push_error(Box::new(callback));
    }

    /// Subscribe to post-completion warnings such as a persistence failure.
    pub fn on_warning(&self, callback: impl FnMut(&JobWarning) + Send + 'static) {
        let gate = self.shared.gate.lock();
        gate.borrow_mut().push_warning(Box::new(callback));
    }

    /// Copy of the current job record.
    pub fn snapshot(&self) -> GenerationJob {
        self.shared.state.lock().job.clone()
    }

    pub fn status(&self) -> JobStatus {
        self.shared.phase.borrow().status
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.shared.events.subscribe()
    }

    /// Wait until the current job is terminal and return its record.
    ///
    /// For a completed job this also waits for materialization, so the
    /// artifact is recorded and `on_complete` has fired when it returns.
    /// Returns immediately when no job has been started.
    pub async fn wait(&self) -> GenerationJob {
        let mut phase = self.shared.phase.subscribe();
        // The sender lives in `self.shared`, so this cannot fail while we
        // hold `self`.
        let _ = phase
            .wait_for(|p| p.status == JobStatus::Idle || p.settled)
            .await;
        self.snapshot()
    }
}

impl Drop for JobController {
    fn drop(&mut self) {
        self.cancel();
    }
}
