//! `genjob-worker` -- run one generation job and report its outcome.
//!
//! Submits a single job to the configured backend (the simulator unless
//! `GENJOB_BACKEND_URL` is set), prints every lifecycle event to stdout as
//! one JSON object per line, and exits non-zero unless the job completes.
//! Ctrl-C cancels the job.
//!
//! Usage: `genjob-worker [SOURCE]`
//!
//! # Environment variables
//!
//! | Variable        | Required          | Default    | Description                       |
//! |-----------------|-------------------|------------|-----------------------------------|
//! | `GENJOB_SOURCE` | unless SOURCE set | --         | Source file path or URL           |
//! | `GENJOB_TOOL`   | no                | `generate` | Generation tool to run            |
//! | `GENJOB_PROMPT` | no                | --         | Free-text instruction             |
//! | `GENJOB_LABEL`  | no                | --         | Label recorded with the artifact  |
//!
//! Controller options (`GENJOB_POLL_INTERVAL_MS`, `GENJOB_MAX_ATTEMPTS`, ...)
//! are read by [`ControllerConfig::from_env`].

use std::sync::Arc;

use genjob_controller::{JobController, JobEvent, MemorySink};
use genjob_core::input::DEFAULT_TOOL;
use genjob_core::{ControllerConfig, JobInput, JobStatus};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "genjob_worker=info,genjob_controller=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ControllerConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid controller configuration");
        std::process::exit(1);
    });

    let source = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("GENJOB_SOURCE").ok())
        .unwrap_or_else(|| {
            tracing::error!("Pass a source as the first argument or set GENJOB_SOURCE");
            std::process::exit(1);
        });

    let tool = std::env::var("GENJOB_TOOL").unwrap_or_else(|_| DEFAULT_TOOL.to_string());
    let mut input = JobInput::new(tool).with_source(source);
    if let Ok(prompt) = std::env::var("GENJOB_PROMPT") {
        input = input.with_prompt(prompt);
    }
    if let Ok(label) = std::env::var("GENJOB_LABEL") {
        input = input.with_label(label);
    }

    let sink = Arc::new(MemorySink::new());
    let controller = JobController::from_config(config, sink.clone()).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to create job controller");
        std::process::exit(1);
    });

    let mut events = controller.subscribe();
    if let Err(e) = controller.start(input) {
        tracing::error!(error = %e, hint = %e.user_message(), "Job rejected");
        std::process::exit(1);
    }

    let wait = controller.wait();
    tokio::pin!(wait);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let job = loop {
        tokio::select! {
            job = &mut wait => break job,
            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event printer fell behind");
                }
                Err(RecvError::Closed) => {}
            },
            _ = &mut interrupt => {
                tracing::info!("Interrupted, cancelling job");
                controller.cancel();
                break controller.snapshot();
            }
        }
    };
    // `wait()` returns once the run is done, so every event is buffered.
    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }

    match (job.status, &job.result, &job.error) {
        (JobStatus::Completed, Some(result), _) => {
            tracing::info!(
                job_id = %job.id,
                artifact_url = %result.artifact_url,
                kind = %result.kind,
                attempts = job.attempt,
                warnings = job.warnings.len(),
                recorded = sink.len(),
                "Job finished",
            );
        }
        (status, _, error) => {
            tracing::error!(
                job_id = %job.id,
                status = %status,
                error = ?error,
                hint = ?error.as_ref().map(|e| e.user_message()),
                "Job did not complete",
            );
            std::process::exit(1);
        }
    }
}

fn print_event(event: &JobEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "Failed to encode event"),
    }
}
