//! Deterministic local backend.
//!
//! [`FallbackSimulator`] behaves like a real queue: submission always
//! succeeds with a synthetic handle, each job reports `IN_PROGRESS` until it
//! has been polled `ticks` times, then `COMPLETED`, and its result is a
//! fixed placeholder artifact. Fetching the result forgets the job. No
//! network calls are made; the only timing is an optional simulated latency
//! per call.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use genjob_core::{ArtifactKind, JobHandle, JobInput, JobResult, RemoteStatus, StatusReport};
use tokio::sync::Mutex;

use crate::backend::JobBackend;
use crate::error::BackendError;

pub const BACKEND_NAME: &str = "simulated";

/// Artifact returned for every simulated job unless overridden.
pub const PLACEHOLDER_ARTIFACT_URL: &str = "https://placehold.co/1024x768.png";

/// Prefix of every synthetic handle.
const HANDLE_PREFIX: &str = "sim-";

/// Network-free [`JobBackend`] for demos and tests.
pub struct FallbackSimulator {
    ticks: u32,
    placeholder: JobResult,
    latency: Duration,
    emit_hints: bool,
    /// Poll count per submitted handle.
    polls: Mutex<HashMap<JobHandle, u32>>,
}

impl FallbackSimulator {
    /// A simulator whose jobs complete on their `ticks`-th poll.
    pub fn new(ticks: u32) -> Self {
        Self {
            ticks: ticks.max(1),
            placeholder: JobResult {
                artifact_url: PLACEHOLDER_ARTIFACT_URL.to_string(),
                kind: ArtifactKind::Image,
            },
            latency: Duration::ZERO,
            emit_hints: false,
            polls: Mutex::new(HashMap::new()),
        }
    }

    /// Return `placeholder` from `fetch_result` instead of the default image.
    pub fn with_placeholder(mut self, placeholder: JobResult) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Sleep for `latency` at the start of every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Report a linear progress hint with every in-progress poll.
    pub fn with_hints(mut self, emit_hints: bool) -> Self {
        self.emit_hints = emit_hints;
        self
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Number of jobs submitted and neither fetched nor cancelled.
    pub async fn active_jobs(&self) -> usize {
        self.polls.lock().await.len()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl JobBackend for FallbackSimulator {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    async fn submit(&self, input: &JobInput) -> Result<JobHandle, BackendError> {
        self.simulate_latency().await;
        let handle = JobHandle::new(format!("{HANDLE_PREFIX}{}", uuid::Uuid::new_v4()));
        self.polls.lock().await.insert(handle.clone(), 0);
        tracing::debug!(handle = %handle, tool = %input.tool, "Simulated job submitted");
        Ok(handle)
    }

    async fn poll_status(&self, handle: &JobHandle) -> Result<StatusReport, BackendError> {
        self.simulate_latency().await;
        let mut polls = self.polls.lock().await;
        let count = polls
            .get_mut(handle)
            .ok_or_else(|| BackendError::UnknownHandle(handle.clone()))?;
        *count = count.saturating_add(1);

        if *count >= self.ticks {
            return Ok(StatusReport::new(RemoteStatus::Completed));
        }
        let report = StatusReport::new(RemoteStatus::InProgress);
        if self.emit_hints {
            let percent = f64::from(*count) * 100.0 / f64::from(self.ticks);
            return Ok(report.with_hint(percent));
        }
        Ok(report)
    }

    async fn fetch_result(&self, handle: &JobHandle) -> Result<JobResult, BackendError> {
        self.simulate_latency().await;
        let mut polls = self.polls.lock().await;
        let count = *polls
            .get(handle)
            .ok_or_else(|| BackendError::UnknownHandle(handle.clone()))?;
        if count < self.ticks {
            return Err(BackendError::NotReady(handle.clone()));
        }
        // Results are handed out once.
        polls.remove(handle);
        Ok(self.placeholder.clone())
    }

    async fn cancel(&self, handle: &JobHandle) -> Result<(), BackendError> {
        self.polls.lock().await.remove(handle);
        tracing::debug!(handle = %handle, "Simulated job cancelled");
        Ok(())
    }
}
