use std::fmt;

use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Opaque identifier the backend assigns to a submitted job.
///
/// Only the backend that issued a handle can interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Media type of a generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Image,
    Video,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The artifact produced by a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// Location of the generated file.
    pub artifact_url: String,
    pub kind: ArtifactKind,
}

/// Job status as reported by the backend on each poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl RemoteStatus {
    /// `true` for statuses after which the backend will not change its answer.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One poll response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: RemoteStatus,
    /// Backend-supplied completion percentage (0-100), if it reports one.
    #[serde(default)]
    pub hint: Option<f64>,
    /// Free-form detail, typically the failure reason for `FAILED`.
    #[serde(default)]
    pub detail: Option<String>,
}

impl StatusReport {
    pub fn new(status: RemoteStatus) -> Self {
        Self {
            status,
            hint: None,
            detail: None,
        }
    }

    pub fn with_hint(mut self, hint: f64) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_status_uses_backend_spelling() {
        let parsed: RemoteStatus = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(parsed, RemoteStatus::InProgress);
        assert_eq!(
            serde_json::to_string(&RemoteStatus::Completed).unwrap(),
            "\"COMPLETED\""
        );
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(!RemoteStatus::Queued.is_terminal());
        assert!(!RemoteStatus::InProgress.is_terminal());
        assert!(RemoteStatus::Completed.is_terminal());
        assert!(RemoteStatus::Failed.is_terminal());
    }

    #[test]
    fn status_report_defaults_optional_fields() {
        let report: StatusReport = serde_json::from_str(r#"{"status":"QUEUED"}"#).unwrap();
        assert_eq!(report, StatusReport::new(RemoteStatus::Queued));
    }

    #[test]
    fn handle_displays_raw_id() {
        assert_eq!(JobHandle::new("abc-123").to_string(), "abc-123");
    }
}
