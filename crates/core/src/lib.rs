//! Domain types and pure logic for generation jobs.
//!
//! Everything in this crate is synchronous and I/O free: the job record and
//! its status machine, the input model, the error taxonomy, configuration,
//! the progress estimator, and the poll schedule. The backend client and the
//! controller that drives a job live in `genjob-backend` and
//! `genjob-controller`.

pub mod config;
pub mod error;
pub mod input;
pub mod job;
pub mod progress;
pub mod schedule;
pub mod types;

pub use config::{BackendMode, ControllerConfig};
pub use error::{ConfigError, ErrorKind, JobError, JobWarning};
pub use input::{JobInput, SourceRef};
pub use job::{GenerationJob, JobStatus, MaterializationTicket};
pub use progress::{ProgressCurve, ProgressEstimator};
pub use schedule::PollSchedule;
pub use types::{ArtifactKind, JobHandle, JobResult, RemoteStatus, StatusReport, Timestamp};
