//! Job input model and pre-submission validation.

use serde::{Deserialize, Serialize};

use crate::error::JobError;

/// Tool name used when the caller does not set one.
pub const DEFAULT_TOOL: &str = "generate";

/// An addressable source artifact: an uploaded file reference or a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SourceRef {
    /// Reference to a previously uploaded file (storage key or file name).
    File(String),
    /// Publicly reachable URL.
    Url(String),
}

impl SourceRef {
    /// Classify a raw string: anything with an `http://` or `https://`
    /// scheme is a URL, everything else is an uploaded file reference.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Url(raw)
        } else {
            Self::File(raw)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::File(s) | Self::Url(s) => s,
        }
    }

    fn is_blank(&self) -> bool {
        self.as_str().trim().is_empty()
    }
}

/// Everything the backend needs to run one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInput {
    /// Which generation tool to run, e.g. `"image-edit"` or `"video-tour"`.
    pub tool: String,
    pub sources: Vec<SourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Label recorded alongside the artifact once the job completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Tool-specific parameters, passed through untouched.
    #[serde(default)]
    pub params: serde_json::Value,
}

impl JobInput {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            sources: Vec::new(),
            prompt: None,
            label: None,
            params: serde_json::Value::Null,
        }
    }

    /// Input for the default tool with a single source.
    pub fn from_source(source: impl Into<String>) -> Self {
        Self::new(DEFAULT_TOOL).with_source(source)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(SourceRef::parse(source));
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }

    /// Check that the input can be submitted.
    ///
    /// - At least one source artifact must be present and non-blank.
    /// - The tool name must be non-blank.
    pub fn validate(&self) -> Result<(), JobError> {
        if self.tool.trim().is_empty() {
            return Err(JobError::validation("tool name must not be empty"));
        }
        if !self.sources.iter().any(|s| !s.is_blank()) {
            return Err(JobError::validation(
                "at least one source file or URL is required",
            ));
        }
        Ok(())
    }
}
