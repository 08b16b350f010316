//! Lifecycle events broadcast by a [`JobController`](crate::JobController).
//!
//! Callbacks are the primary way to react to a job; events are for
//! observers that want the whole stream (loggers, UI bridges). They obey
//! the same rule as callbacks: nothing is published for a job after it has
//! been cancelled, except the `Cancelled` event itself.

use genjob_core::{JobError, JobHandle, JobResult, JobWarning};
use serde::Serialize;
use uuid::Uuid;

/// Broadcast channel capacity for job events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A job lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// The backend accepted the job.
    Submitted { job_id: Uuid, handle: JobHandle },

    /// Progress increased.
    Progress {
        job_id: Uuid,
        /// Completion percentage (0-100).
        percent: u8,
        attempt: u32,
    },

    /// The job completed and its result was fetched.
    Completed { job_id: Uuid, result: JobResult },

    /// The job reached `Failed` or `TimedOut`.
    Failed { job_id: Uuid, error: JobError },

    /// Something went wrong after the job already succeeded.
    Warning { job_id: Uuid, warning: JobWarning },

    /// The job was cancelled by the caller or superseded by a new start.
    Cancelled { job_id: Uuid },
}

impl JobEvent {
    pub fn job_id(&self) -> Uuid {
        match self {
            Self::Submitted { job_id, .. }
            | Self::Progress { job_id, .. }
            | Self::Completed { job_id, .. }
            | Self::Failed { job_id, .. }
            | Self::Warning { job_id, .. }
            | Self::Cancelled { job_id } => *job_id,
        }
    }
}
