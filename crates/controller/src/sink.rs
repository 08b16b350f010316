//! Persistence sink: where completed artifacts are recorded.

use async_trait::async_trait;
use genjob_core::{ArtifactKind, Timestamp};
use parking_lot::Mutex;
use serde::Serialize;

/// Errors raised by a [`PersistenceSink`].
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The store could not be reached.
    #[error("Persistence sink unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the record.
    #[error("Failed to store artifact: {0}")]
    Rejected(String),
}

/// Records completed artifacts (asset library, project media, ...).
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn record_artifact(
        &self,
        url: &str,
        kind: ArtifactKind,
        label: Option<&str>,
    ) -> Result<(), SinkError>;
}

/// One artifact recorded by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactRecord {
    pub url: String,
    pub kind: ArtifactKind,
    pub label: Option<String>,
    pub recorded_at: Timestamp,
}

/// In-memory sink for tests, demos and the worker binary.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<ArtifactRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far, oldest first.
    pub fn records(&self) -> Vec<ArtifactRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl PersistenceSink for MemorySink {
    async fn record_artifact(
        &self,
        url: &str,
        kind: ArtifactKind,
        label: Option<&str>,
    ) -> Result<(), SinkError> {
        self.records.lock().push(ArtifactRecord {
            url: url.to_string(),
            kind,
            label: label.map(str::to_string),
            recorded_at: chrono::Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_sink_keeps_records_in_order() {
        let sink = MemorySink::new();
        sink.record_artifact("a.png", ArtifactKind::Image, Some("hero"))
            .await
            .unwrap();
        sink.record_artifact("b.mp4", ArtifactKind::Video, None)
            .await
            .unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].url, "a.png");
        assert_eq!(records[0].label.as_deref(), Some("hero"));
        assert_eq!(records[1].kind, ArtifactKind::Video);
    }

    #[test]
    fn new_sink_is_empty() {
        assert!(MemorySink::new().is_empty());
    }
}
