//! The live record of one generation job and its status machine.
//!
//! [`GenerationJob`] only permits the transitions below; every mutator
//! returns `false` and leaves the record untouched when called from a state
//! that does not allow it.
//!
//! ```text
//! Idle -> Submitting -> Polling -> Completed
//!              |           |----> Failed
//!              |           `----> TimedOut
//!              `-> Failed
//! (any non-terminal) -> Cancelled
//! ```

use serde::Serialize;
use uuid::Uuid;

use crate::error::{JobError, JobWarning};
use crate::progress::COMPLETE;
use crate::types::{JobHandle, JobResult, Timestamp};

/// Lifecycle status of a [`GenerationJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Idle,
    Submitting,
    Polling,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl JobStatus {
    /// `true` for states from which no further transition occurs.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::TimedOut | Self::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Polling => "polling",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one job's lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationJob {
    /// Locally assigned id, used to correlate logs and events.
    pub id: Uuid,
    pub tool: String,
    pub label: Option<String>,
    pub status: JobStatus,
    pub handle: Option<JobHandle>,
    /// Poll cycles executed so far.
    pub attempt: u32,
    /// Completion percentage, 0-100.
    pub progress: u8,
    pub result: Option<JobResult>,
    pub error: Option<JobError>,
    /// Non-fatal problems raised after completion.
    pub warnings: Vec<JobWarning>,
    pub created_at: Timestamp,
    pub finished_at: Option<Timestamp>,
    #[serde(skip)]
    materialized: bool,
}

/// Single-use permission to materialize a completed job's artifact.
///
/// Only [`GenerationJob::materialization_ticket`] creates tickets, and it
/// does so at most once per job.
#[derive(Debug, PartialEq)]
pub struct MaterializationTicket {
    pub job_id: Uuid,
    pub result: JobResult,
    pub label: Option<String>,
}

impl GenerationJob {
    /// Placeholder record for a controller that has not started a job.
    pub fn idle() -> Self {
        Self::record(Uuid::nil(), String::new(), None, JobStatus::Idle)
    }

    /// A freshly started job, about to be submitted.
    pub fn submitting(id: Uuid, tool: impl Into<String>, label: Option<String>) -> Self {
        Self::record(id, tool.into(), label, JobStatus::Submitting)
    }

    fn record(id: Uuid, tool: String, label: Option<String>, status: JobStatus) -> Self {
        Self {
            id,
            tool,
            label,
            status,
            handle: None,
            attempt: 0,
            progress: 0,
            result: None,
            error: None,
            warnings: Vec::new(),
            created_at: chrono::Utc::now(),
            finished_at: None,
            materialized: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `Submitting -> Polling`: the backend accepted the job.
    pub fn mark_polling(&mut self, handle: JobHandle, initial_progress: u8) -> bool {
        if self.status != JobStatus::Submitting {
            return false;
        }
        self.status = JobStatus::Polling;
        self.handle = Some(handle);
        self.attempt = 0;
        self.progress = self.progress.max(initial_progress.min(COMPLETE - 1));
        true
    }

    /// Count one non-terminal poll and apply the new progress estimate.
    ///
    /// Progress never decreases and stays below 100. Returns the new
    /// attempt count, or `None` when not polling.
    pub fn record_tick(&mut self, progress: u8) -> Option<u32> {
        if self.status != JobStatus::Polling {
            return None;
        }
        self.attempt += 1;
        self.progress = self.progress.max(progress.min(COMPLETE - 1));
        Some(self.attempt)
    }

    /// `Polling -> Completed` with the fetched result.
    pub fn complete(&mut self, result: JobResult) -> bool {
        if self.status != JobStatus::Polling {
            return false;
        }
        self.status = JobStatus::Completed;
        self.progress = COMPLETE;
        self.result = Some(result);
        self.finished_at = Some(chrono::Utc::now());
        true
    }

    /// `Submitting | Polling -> Failed`, or `Polling -> TimedOut` for a
    /// [`JobError::Timeout`].
    pub fn fail(&mut self, error: JobError) -> bool {
        let allowed = match error {
            JobError::Timeout { .. } => self.status == JobStatus::Polling,
            _ => matches!(self.status, JobStatus::Submitting | JobStatus::Polling),
        };
        if !allowed {
            return false;
        }
        self.status = match error {
            JobError::Timeout { .. } => JobStatus::TimedOut,
            _ => JobStatus::Failed,
        };
        self.error = Some(error);
        self.finished_at = Some(chrono::Utc::now());
        true
    }

    /// Any non-terminal state `-> Cancelled`. Idempotent.
    pub fn cancel(&mut self) -> bool {
        if self.is_terminal() || self.status == JobStatus::Idle {
            return false;
        }
        self.status = JobStatus::Cancelled;
        self.finished_at = Some(chrono::Utc::now());
        true
    }

    pub fn push_warning(&mut self, warning: JobWarning) {
        self.warnings.push(warning);
    }

    /// Issue the materialization ticket for a completed job.
    ///
    /// Returns `None` unless the job is `Completed`, and `None` on every
    /// call after the first.
    pub fn materialization_ticket(&mut self) -> Option<MaterializationTicket> {
        if self.status != JobStatus::Completed || self.materialized {
            return None;
        }
        let result = self.result.clone()?;
        self.materialized = true;
        Some(MaterializationTicket {
            job_id: self.id,
            result,
            label: self.label.clone(),
        })
    }
}

impl Default for GenerationJob {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArtifactKind;

    fn polling_job() -> GenerationJob {
        let mut job = GenerationJob::submitting(Uuid::now_v7(), "image-edit", None);
        assert!(job.mark_polling(JobHandle::new("h-1"), 10));
        job
    }

    fn result() -> JobResult {
        JobResult {
            artifact_url: "https://cdn.example.com/out.png".into(),
            kind: ArtifactKind::Image,
        }
    }

    // -- Status --

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Idle.is_terminal());
        assert!(!JobStatus::Submitting.is_terminal());
        assert!(!JobStatus::Polling.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::TimedOut.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    // -- Transitions --

    #[test]
    fn polling_starts_at_floor_with_zero_attempts() {
        let job = polling_job();
        assert_eq!(job.status, JobStatus::Polling);
        assert_eq!(job.attempt, 0);
        assert_eq!(job.progress, 10);
        assert!(job.result.is_none() && job.error.is_none());
    }

    #[test]
    fn tick_never_lowers_progress() {
        let mut job = polling_job();
        job.record_tick(40);
        assert_eq!(job.record_tick(20), Some(2));
        assert_eq!(job.progress, 40);
    }

    #[test]
    fn tick_cannot_reach_complete() {
        let mut job = polling_job();
        job.record_tick(100);
        assert_eq!(job.progress, 99);
    }

    #[test]
    fn complete_sets_result_and_full_progress() {
        let mut job = polling_job();
        assert!(job.complete(result()));
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.error.is_none());
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn timeout_error_maps_to_timed_out() {
        let mut job = polling_job();
        assert!(job.fail(JobError::Timeout { attempts: 3 }));
        assert_eq!(job.status, JobStatus::TimedOut);
        assert!(job.result.is_none());
    }

    #[test]
    fn submission_failure_from_submitting() {
        let mut job = GenerationJob::submitting(Uuid::now_v7(), "t", None);
        assert!(job.fail(JobError::Submission {
            message: "503".into()
        }));
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[test]
    fn timeout_not_allowed_while_submitting() {
        let mut job = GenerationJob::submitting(Uuid::now_v7(), "t", None);
        assert!(!job.fail(JobError::Timeout { attempts: 1 }));
        assert_eq!(job.status, JobStatus::Submitting);
    }

    #[test]
    fn terminal_states_are_frozen() {
        let mut job = polling_job();
        job.complete(result());
        assert!(!job.fail(JobError::BackendJob {
            reason: "late".into()
        }));
        assert!(!job.cancel());
        assert_eq!(job.record_tick(50), None);
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut job = polling_job();
        assert!(job.cancel());
        assert!(!job.cancel());
        assert_eq!(job.status, JobStatus::Cancelled);
        assert!(job.result.is_none() && job.error.is_none());
    }

    #[test]
    fn idle_job_cannot_be_cancelled() {
        let mut job = GenerationJob::idle();
        assert!(!job.cancel());
        assert_eq!(job.status, JobStatus::Idle);
    }

    // -- Materialization --

    #[test]
    fn ticket_issued_once() {
        let mut job = polling_job();
        job.complete(result());
        let ticket = job.materialization_ticket().expect("first ticket");
        assert_eq!(ticket.result, result());
        assert_eq!(ticket.job_id, job.id);
        assert!(job.materialization_ticket().is_none());
    }

    #[test]
    fn no_ticket_before_completion() {
        let mut job = polling_job();
        assert!(job.materialization_ticket().is_none());
        job.complete(result());
        assert!(job.materialization_ticket().is_some());
    }
}
