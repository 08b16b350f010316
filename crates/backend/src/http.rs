//! REST client for a queue-based generation service.
//!
//! Wire format:
//!
//! | Call            | Request                        | Response body                                  |
//! |-----------------|--------------------------------|------------------------------------------------|
//! | `submit`        | `POST {base}/jobs` + `JobInput`| `{"job_id": "..."}`                            |
//! | `poll_status`   | `GET {base}/jobs/{id}`         | `{"status": "...", "progress"?: f64, "error"?: "..."}` |
//! | `fetch_result`  | `GET {base}/jobs/{id}/result`  | `{"artifact_url": "...", "kind": "image"}`      |
//! | `cancel`        | `POST {base}/jobs/{id}/cancel` | ignored                                        |

use async_trait::async_trait;
use genjob_core::{JobHandle, JobInput, JobResult, RemoteStatus, StatusReport};
use serde::Deserialize;

use crate::backend::JobBackend;
use crate::error::BackendError;

pub const BACKEND_NAME: &str = "http";

/// HTTP client for a single generation service.
pub struct HttpJobBackend {
    client: reqwest::Client,
    base_url: String,
}

/// Response returned by `POST /jobs` after the job is queued.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    job_id: String,
}

/// Response returned by `GET /jobs/{id}`.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: RemoteStatus,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

impl From<StatusResponse> for StatusReport {
    fn from(resp: StatusResponse) -> Self {
        Self {
            status: resp.status,
            hint: resp.progress,
            detail: resp.error,
        }
    }
}

impl HttpJobBackend {
    /// Create a client for the service at `base_url`, e.g. `http://host:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across controllers).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn job_url(&self, handle: &JobHandle) -> String {
        format!("{}/jobs/{}", self.base_url, handle)
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`BackendError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl JobBackend for HttpJobBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    async fn submit(&self, input: &JobInput) -> Result<JobHandle, BackendError> {
        let response = self
            .client
            .post(format!("{}/jobs", self.base_url))
            .json(input)
            .send()
            .await?;

        let body: SubmitResponse = Self::parse_response(response).await?;
        tracing::debug!(job_id = %body.job_id, tool = %input.tool, "Job queued on backend");
        Ok(JobHandle::new(body.job_id))
    }

    async fn poll_status(&self, handle: &JobHandle) -> Result<StatusReport, BackendError> {
        let response = self.client.get(self.job_url(handle)).send().await?;
        let body: StatusResponse = Self::parse_response(response).await?;
        Ok(body.into())
    }

    async fn fetch_result(&self, handle: &JobHandle) -> Result<JobResult, BackendError> {
        let response = self
            .client
            .get(format!("{}/result", self.job_url(handle)))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn cancel(&self, handle: &JobHandle) -> Result<(), BackendError> {
        let response = self
            .client
            .post(format!("{}/cancel", self.job_url(handle)))
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let backend = HttpJobBackend::new("http://gen.internal:8080/");
        assert_eq!(backend.base_url(), "http://gen.internal:8080");
        assert_eq!(
            backend.job_url(&JobHandle::new("j1")),
            "http://gen.internal:8080/jobs/j1"
        );
    }

    #[test]
    fn status_response_maps_progress_to_hint() {
        let resp: StatusResponse =
            serde_json::from_str(r#"{"status":"IN_PROGRESS","progress":42.5}"#).unwrap();
        let report: StatusReport = resp.into();
        assert_eq!(report.status, RemoteStatus::InProgress);
        assert_eq!(report.hint, Some(42.5));
        assert!(report.detail.is_none());
    }
}
