use serde::Serialize;

/// Terminal failure of a generation job.
///
/// Every variant is captured into [`GenerationJob::error`](crate::job::GenerationJob)
/// and delivered through the controller's error callback. None of them is
/// retried automatically: a retry is a new `start` by the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobError {
    /// The input has no addressable source artifact. Raised synchronously,
    /// before anything is submitted.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// The backend rejected the submission or could not be reached.
    #[error("Submission failed: {message}")]
    Submission { message: String },

    /// The backend reported `FAILED` for the job itself.
    #[error("Generation failed: {reason}")]
    BackendJob { reason: String },

    /// The job completed but its result could not be retrieved.
    #[error("Failed to fetch result: {message}")]
    ResultFetch { message: String },

    /// The attempt ceiling was reached without a terminal backend status.
    #[error("Timed out after {attempts} poll attempts")]
    Timeout { attempts: u32 },
}

/// Discriminant of [`JobError`], for callers that branch on the kind only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Submission,
    BackendJob,
    ResultFetch,
    Timeout,
}

impl JobError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Submission { .. } => ErrorKind::Submission,
            Self::BackendJob { .. } => ErrorKind::BackendJob,
            Self::ResultFetch { .. } => ErrorKind::ResultFetch,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Short, actionable message suitable for showing next to a retry button.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message } => format!("Add a source file or URL first ({message})."),
            Self::Submission { .. } => {
                "The generation service did not accept the job. Try again in a moment.".to_string()
            }
            Self::BackendJob { reason } => {
                format!("Generation failed: {reason}. Adjust the input and retry.")
            }
            Self::ResultFetch { .. } => {
                "The job finished but its result could not be downloaded. Check the dashboard before retrying."
                    .to_string()
            }
            Self::Timeout { .. } => {
                "Timed out waiting for the result. Check the dashboard before retrying.".to_string()
            }
        }
    }
}

/// Non-fatal problem raised after a job has already succeeded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobWarning {
    /// The artifact could not be recorded by the persistence sink.
    #[error("Failed to record artifact {artifact_url}: {message}")]
    PersistenceFailed {
        artifact_url: String,
        message: String,
    },
}

/// Invalid or unparseable controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable was set but could not be parsed.
    #[error("{var} has invalid value '{value}'")]
    InvalidEnv { var: &'static str, value: String },

    /// A field is outside its allowed range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
