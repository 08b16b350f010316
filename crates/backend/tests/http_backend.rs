//! Integration tests for `HttpJobBackend` against a mock HTTP server.
//!
//! Each test stands up a `mockito` server, points the backend at it, and
//! checks request shape plus response and error mapping.

use assert_matches::assert_matches;
use genjob_backend::{BackendError, HttpJobBackend, JobBackend};
use genjob_core::{ArtifactKind, JobHandle, JobInput, RemoteStatus};
use mockito::Matcher;

// ---------------------------------------------------------------------------
// Test: submit posts the input and returns the backend's job id
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_posts_input_and_returns_handle() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/jobs")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "tool": "image-edit",
            "sources": [{"type": "file", "value": "img.png"}],
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"job_id":"job-42"}"#)
        .create_async()
        .await;

    let backend = HttpJobBackend::new(server.url());
    let input = JobInput::new("image-edit").with_source("img.png");
    let handle = backend.submit(&input).await.expect("submit should succeed");

    assert_eq!(handle, JobHandle::new("job-42"));
    mock.assert_async().await;
}

// ---------------------------------------------------------------------------
// Test: a rejected submission surfaces status and body
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_rejection_maps_to_api_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/jobs")
        .with_status(422)
        .with_body("content policy violation")
        .create_async()
        .await;

    let backend = HttpJobBackend::new(server.url());
    let err = backend
        .submit(&JobInput::from_source("img.png"))
        .await
        .unwrap_err();

    assert_matches!(
        err,
        BackendError::Api { status: 422, ref body } if body == "content policy violation"
    );
}

// ---------------------------------------------------------------------------
// Test: poll maps status, progress hint and error detail
// ---------------------------------------------------------------------------

#[tokio::test]
async fn poll_maps_in_progress_with_hint() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/jobs/job-42")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"IN_PROGRESS","progress":37.0}"#)
        .create_async()
        .await;

    let backend = HttpJobBackend::new(server.url());
    let report = backend
        .poll_status(&JobHandle::new("job-42"))
        .await
        .unwrap();

    assert_eq!(report.status, RemoteStatus::InProgress);
    assert_eq!(report.hint, Some(37.0));
}

#[tokio::test]
async fn poll_maps_failed_with_detail() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/jobs/job-7")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"FAILED","error":"nsfw content detected"}"#)
        .create_async()
        .await;

    let backend = HttpJobBackend::new(server.url());
    let report = backend.poll_status(&JobHandle::new("job-7")).await.unwrap();

    assert_eq!(report.status, RemoteStatus::Failed);
    assert_eq!(report.detail.as_deref(), Some("nsfw content detected"));
}

#[tokio::test]
async fn poll_with_malformed_body_is_request_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/jobs/job-1")
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let backend = HttpJobBackend::new(server.url());
    let err = backend
        .poll_status(&JobHandle::new("job-1"))
        .await
        .unwrap_err();

    assert_matches!(err, BackendError::Request(_));
}

// ---------------------------------------------------------------------------
// Test: fetch_result decodes the artifact
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_result_decodes_artifact() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/jobs/job-42/result")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"artifact_url":"https://cdn.example.com/tour.mp4","kind":"video"}"#)
        .create_async()
        .await;

    let backend = HttpJobBackend::new(server.url());
    let result = backend
        .fetch_result(&JobHandle::new("job-42"))
        .await
        .unwrap();

    assert_eq!(result.artifact_url, "https://cdn.example.com/tour.mp4");
    assert_eq!(result.kind, ArtifactKind::Video);
}

#[tokio::test]
async fn fetch_result_not_found_is_api_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/jobs/job-42/result")
        .with_status(404)
        .create_async()
        .await;

    let backend = HttpJobBackend::new(server.url());
    let err = backend
        .fetch_result(&JobHandle::new("job-42"))
        .await
        .unwrap_err();

    assert_matches!(err, BackendError::Api { status: 404, .. });
}

// ---------------------------------------------------------------------------
// Test: cancel posts to the cancel endpoint
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_posts_to_cancel_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/jobs/job-42/cancel")
        .with_status(204)
        .create_async()
        .await;

    let backend = HttpJobBackend::new(server.url());
    backend.cancel(&JobHandle::new("job-42")).await.unwrap();

    mock.assert_async().await;
}
