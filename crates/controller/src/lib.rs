//! Asynchronous generation job controller.
//!
//! [`JobController`] submits a job to a [`JobBackend`](genjob_backend::JobBackend),
//! polls it on a fixed or backoff schedule, reports monotonic progress,
//! enforces an attempt ceiling, and on success hands the result to a
//! [`ResultMaterializer`] exactly once. Cancellation and restarts are safe
//! at any point: a cancelled job never reports again.

mod callbacks;
pub mod controller;
pub mod events;
pub mod materializer;
mod run;
pub mod sink;

pub use controller::JobController;
pub use events::JobEvent;
pub use materializer::{AdvanceFn, ResultMaterializer};
pub use sink::{ArtifactRecord, MemorySink, PersistenceSink, SinkError};
