//! Job backend interface and implementations.
//!
//! [`JobBackend`] is the narrow submit / poll / fetch-result contract the
//! controller is written against. Two implementations ship here:
//!
//! - [`HttpJobBackend`]: REST client for a queue-based generation service.
//! - [`FallbackSimulator`]: deterministic, network-free stand-in for demos
//!   and tests.
//!
//! Which one a process uses is decided once, at construction, by
//! [`build_backend`].

pub mod backend;
pub mod error;
pub mod http;
pub mod simulator;

use std::sync::Arc;

use genjob_core::BackendMode;

pub use backend::{JobBackend, SharedBackend};
pub use error::BackendError;
pub use http::HttpJobBackend;
pub use simulator::FallbackSimulator;

/// Construct the backend selected by the configuration.
pub fn build_backend(mode: &BackendMode) -> SharedBackend {
    match mode {
        BackendMode::Http { base_url } => {
            tracing::info!(base_url = %base_url, "Using HTTP job backend");
            Arc::new(HttpJobBackend::new(base_url.clone()))
        }
        BackendMode::Simulated { ticks } => {
            tracing::info!(ticks, "Using simulated job backend");
            Arc::new(FallbackSimulator::new(*ticks))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_simulator_for_simulated_mode() {
        let backend = build_backend(&BackendMode::Simulated { ticks: 3 });
        assert_eq!(backend.name(), simulator::BACKEND_NAME);
    }

    #[test]
    fn builds_http_for_http_mode() {
        let backend = build_backend(&BackendMode::Http {
            base_url: "http://localhost:9999".into(),
        });
        assert_eq!(backend.name(), http::BACKEND_NAME);
    }
}
