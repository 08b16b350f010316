//! The contract between the job controller and a processing backend.

use std::sync::Arc;

use async_trait::async_trait;
use genjob_core::{JobHandle, JobInput, JobResult, StatusReport};

use crate::error::BackendError;

/// A queue-based, poll-only generation backend.
///
/// Implementations must be interchangeable: the controller never inspects
/// which one it is talking to.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Queue a job and return the handle used for every later call.
    async fn submit(&self, input: &JobInput) -> Result<JobHandle, BackendError>;

    /// Report the current status of a submitted job.
    async fn poll_status(&self, handle: &JobHandle) -> Result<StatusReport, BackendError>;

    /// Retrieve the artifact. Only called after `COMPLETED` was observed.
    async fn fetch_result(&self, handle: &JobHandle) -> Result<JobResult, BackendError>;

    /// Ask the backend to drop a job. Best effort; the default does nothing.
    async fn cancel(&self, handle: &JobHandle) -> Result<(), BackendError> {
        let _ = handle;
        Ok(())
    }
}

/// Backend shared between a controller and its polling task.
pub type SharedBackend = Arc<dyn JobBackend>;
