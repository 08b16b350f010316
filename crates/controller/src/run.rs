//! One job run: submit, poll until terminal, fetch and materialize.
//!
//! A run is a single sequential task. Each tick sleeps, issues exactly one
//! status request and waits for its answer before deciding, so at most one
//! request per job is ever in flight. Every await is raced against the
//! run's cancellation token; once the token fires the run stops at the
//! next await and none of its results are applied.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use genjob_core::progress::COMPLETE;
use genjob_core::{
    ControllerConfig, JobError, JobHandle, JobInput, PollSchedule, ProgressEstimator,
    RemoteStatus, StatusReport,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::controller::{Notice, Shared};

/// What the loop does after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Fetch,
    Stop,
}

pub(crate) struct JobRun {
    id: Uuid,
    input: JobInput,
    run: CancellationToken,
    shared: Arc<Shared>,
    estimator: ProgressEstimator,
    poll_interval: Duration,
    max_attempts: u32,
    schedule: PollSchedule,
}

impl JobRun {
    pub(crate) fn new(
        id: Uuid,
        input: JobInput,
        run: CancellationToken,
        shared: Arc<Shared>,
        estimator: ProgressEstimator,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            id,
            input,
            run,
            shared,
            estimator,
            poll_interval: config.poll_interval,
            max_attempts: config.max_attempts,
            schedule: config.schedule,
        }
    }

    pub(crate) async fn drive(self) {
        let Some(handle) = self.submit().await else {
            return;
        };

        let mut delay = self.schedule.first_delay(self.poll_interval);
        loop {
            if self.guarded(tokio::time::sleep(delay)).await.is_none() {
                return;
            }
            delay = self.schedule.next_delay(delay, self.poll_interval);

            let step = match self.guarded(self.shared.backend.poll_status(&handle)).await {
                None => return,
                Some(Ok(report)) => self.observe(report),
                Some(Err(e)) => {
                    tracing::warn!(handle = %handle, error = %e, "Status poll failed");
                    self.tick(None, false)
                }
            };

            match step {
                Step::Continue => {}
                Step::Fetch => {
                    self.finish(&handle).await;
                    return;
                }
                Step::Stop => return,
            }
        }
    }

    /// Race `fut` against cancellation. `None` means the run was cancelled.
    async fn guarded<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.run.cancelled() => None,
            out = fut => Some(out),
        }
    }

    async fn submit(&self) -> Option<JobHandle> {
        let handle = match self.guarded(self.shared.backend.submit(&self.input)).await {
            None => {
                tracing::debug!("Cancelled during submission");
                return None;
            }
            Some(Ok(handle)) => handle,
            Some(Err(e)) => {
                self.fail(JobError::Submission {
                    message: e.to_string(),
                });
                return None;
            }
        };

        let initial = self.estimator.initial();
        let accepted = self.shared.apply(&self.run, |job, notices| {
            if !job.mark_polling(handle.clone(), initial) {
                return false;
            }
            notices.push(Notice::Submitted(handle.clone()));
            notices.push(Notice::Progress {
                percent: job.progress,
                attempt: 0,
            });
            true
        });
        if !accepted {
            // Cancelled while the submission was answered.
            self.shared.cancel_remote(self.id, handle);
            return None;
        }

        tracing::info!(
            handle = %handle,
            backend = self.shared.backend.name(),
            "Job submitted",
        );
        Some(handle)
    }

    fn observe(&self, report: StatusReport) -> Step {
        match report.status {
            RemoteStatus::Completed => Step::Fetch,
            RemoteStatus::Failed => {
                let reason = report
                    .detail
                    .unwrap_or_else(|| "backend reported failure".to_string());
                self.fail(JobError::BackendJob { reason });
                Step::Stop
            }
            RemoteStatus::Queued | RemoteStatus::InProgress => self.tick(report.hint, true),
        }
    }

    /// Count one non-terminal poll. A transport failure counts the attempt
    /// but leaves progress where it was.
    fn tick(&self, hint: Option<f64>, estimate: bool) -> Step {
        let estimator = self.estimator;
        let max_attempts = self.max_attempts;
        let mut step = Step::Continue;

        let applied = self.shared.apply(&self.run, |job, notices| {
            let previous = job.progress;
            let next = if estimate {
                estimator.estimate(job.attempt + 1, max_attempts, hint, previous)
            } else {
                previous
            };
            let Some(attempt) = job.record_tick(next) else {
                return false;
            };

            if attempt >= max_attempts {
                let error = JobError::Timeout { attempts: attempt };
                tracing::warn!(attempts = attempt, "Job timed out");
                job.fail(error.clone());
                notices.push(Notice::Error(error));
                step = Step::Stop;
            } else {
                tracing::debug!(attempt, progress = job.progress, "Job still running");
                if job.progress > previous {
                    notices.push(Notice::Progress {
                        percent: job.progress,
                        attempt,
                    });
                }
            }
            true
        });

        if applied {
            step
        } else {
            Step::Stop
        }
    }

    fn fail(&self, error: JobError) {
        self.shared.apply(&self.run, |job, notices| {
            if !job.fail(error.clone()) {
                return false;
            }
            tracing::error!(kind = ?error.kind(), error = %error, "Job failed");
            notices.push(Notice::Error(error));
            true
        });
    }

    /// Fetch the result of a completed job, then materialize it.
    async fn finish(&self, handle: &JobHandle) {
        let result = match self.guarded(self.shared.backend.fetch_result(handle)).await {
            None => return,
            Some(Ok(result)) => result,
            Some(Err(e)) => {
                self.fail(JobError::ResultFetch {
                    message: e.to_string(),
                });
                return;
            }
        };

        let mut ticket = None;
        self.shared.apply(&self.run, |job, notices| {
            if !job.complete(result.clone()) {
                return false;
            }
            ticket = job.materialization_ticket();
            notices.push(Notice::Progress {
                percent: COMPLETE,
                attempt: job.attempt,
            });
            notices.push(Notice::Complete(result.clone()));
            true
        });
        let Some(ticket) = ticket else {
            return;
        };
        tracing::info!(artifact_url = %result.artifact_url, kind = %result.kind, "Job completed");

        // Completed is terminal: materialization runs to the end even if the
        // caller cancels meanwhile. Only the warning callback is suppressed.
        if let Some(warning) = self.shared.materializer.materialize(ticket).await {
            self.shared
                .update_job(self.id, |job| job.push_warning(warning.clone()));
            self.shared.apply(&self.run, |_job, notices| {
                notices.push(Notice::Warning(warning));
                true
            });
        }
        self.shared.settle(self.id);
    }
}
