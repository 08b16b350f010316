//! Turns a completed job's result into durable state.
//!
//! Materialization runs at most once per job: it needs a
//! [`MaterializationTicket`], which a
//! [`GenerationJob`](genjob_core::GenerationJob) hands out only once and
//! only after it reached `Completed`. A sink failure never fails the
//! job; it becomes a [`JobWarning`] on an otherwise successful job.

use std::sync::Arc;

use genjob_core::{JobResult, JobWarning, MaterializationTicket};

use crate::sink::PersistenceSink;

/// Hook that hands the result to the next workflow step.
pub type AdvanceFn = Box<dyn Fn(&JobResult) + Send + Sync>;

pub struct ResultMaterializer {
    sink: Arc<dyn PersistenceSink>,
    advance: Option<AdvanceFn>,
}

impl ResultMaterializer {
    pub fn new(sink: Arc<dyn PersistenceSink>) -> Self {
        Self {
            sink,
            advance: None,
        }
    }

    /// Invoke `advance` with the result after every materialization.
    pub fn with_advance(mut self, advance: impl Fn(&JobResult) + Send + Sync + 'static) -> Self {
        self.advance = Some(Box::new(advance));
        self
    }

    /// Record the ticket's artifact in the sink, then hand the result to
    /// the workflow hook.
    ///
    /// Consumes the ticket, so a job is materialized at most once. A sink
    /// failure is logged and returned as a warning; the workflow still
    /// advances.
    pub async fn materialize(&self, ticket: MaterializationTicket) -> Option<JobWarning> {
        let warning = self.persist(&ticket).await.err();
        if let Some(advance) = &self.advance {
            advance(&ticket.result);
        }
        warning
    }

    async fn persist(&self, ticket: &MaterializationTicket) -> Result<(), JobWarning> {
        let result = &ticket.result;
        match self
            .sink
            .record_artifact(&result.artifact_url, result.kind, ticket.label.as_deref())
            .await
        {
            Ok(()) => {
                tracing::info!(
                    job_id = %ticket.job_id,
                    artifact_url = %result.artifact_url,
                    kind = %result.kind,
                    "Artifact recorded",
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %ticket.job_id,
                    artifact_url = %result.artifact_url,
                    error = %e,
                    "Failed to record artifact",
                );
                Err(JobWarning::PersistenceFailed {
                    artifact_url: result.artifact_url.clone(),
                    message: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use genjob_core::{ArtifactKind, GenerationJob, JobHandle, JobStatus};
    use uuid::Uuid;

    use super::*;
    use crate::sink::{MemorySink, SinkError};

    struct BrokenSink;

    #[async_trait]
    impl PersistenceSink for BrokenSink {
        async fn record_artifact(
            &self,
            _url: &str,
            _kind: ArtifactKind,
            _label: Option<&str>,
        ) -> Result<(), SinkError> {
            Err(SinkError::Unavailable("disk full".into()))
        }
    }

    fn completed_job() -> GenerationJob {
        let mut job = GenerationJob::submitting(Uuid::now_v7(), "image-edit", Some("hero".into()));
        job.mark_polling(JobHandle::new("h-1"), 10);
        job.complete(JobResult {
            artifact_url: "https://cdn.example.com/out.png".into(),
            kind: ArtifactKind::Image,
        });
        job
    }

    fn counting(counter: &Arc<AtomicUsize>) -> impl Fn(&JobResult) + Send + Sync + 'static {
        let counter = Arc::clone(counter);
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn materializes_once() {
        let sink = Arc::new(MemorySink::new());
        let advanced = Arc::new(AtomicUsize::new(0));
        let materializer = ResultMaterializer::new(sink.clone()).with_advance(counting(&advanced));
        let mut job = completed_job();

        let ticket = job.materialization_ticket().unwrap();
        assert!(materializer.materialize(ticket).await.is_none());
        assert!(job.materialization_ticket().is_none());

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].label.as_deref(), Some("hero"));
        assert_eq!(advanced.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sink_failure_becomes_warning_and_still_advances() {
        let advanced = Arc::new(AtomicUsize::new(0));
        let materializer =
            ResultMaterializer::new(Arc::new(BrokenSink)).with_advance(counting(&advanced));
        let mut job = completed_job();

        let warning = materializer
            .materialize(job.materialization_ticket().unwrap())
            .await;

        assert_matches!(
            warning,
            Some(JobWarning::PersistenceFailed { ref message, .. }) if message.contains("disk full")
        );
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(advanced.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn incomplete_job_has_no_ticket() {
        let mut job = GenerationJob::submitting(Uuid::now_v7(), "image-edit", None);
        assert!(job.materialization_ticket().is_none());
    }
}
