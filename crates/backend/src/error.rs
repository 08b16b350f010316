use genjob_core::JobHandle;

/// Errors from a [`JobBackend`](crate::JobBackend) call.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The HTTP request itself failed (network, DNS, TLS, body decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The backend does not know this handle.
    #[error("Unknown job handle: {0}")]
    UnknownHandle(JobHandle),

    /// A result was requested before the job completed.
    #[error("Job {0} has not completed")]
    NotReady(JobHandle),
}
