//! Controller configuration.
//!
//! A closed set of options, validated before a controller is built. Values
//! come from code (tests, embedding applications) or from environment
//! variables via [`ControllerConfig::from_env`].

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::progress::{ProgressCurve, ProgressEstimator, DEFAULT_CEILING, DEFAULT_FLOOR};
use crate::schedule::PollSchedule;

/// Default delay between poll ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);
/// Default attempt ceiling (5 minutes at the default interval).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;
/// Default number of polls the simulated backend needs to complete a job.
pub const DEFAULT_SIMULATED_TICKS: u32 = 5;

/// Which backend implementation to construct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendMode {
    /// Real queue-based backend reachable over HTTP.
    Http { base_url: String },
    /// Local simulation, no network calls.
    Simulated { ticks: u32 },
}

impl BackendMode {
    pub fn is_simulated(&self) -> bool {
        matches!(self, Self::Simulated { .. })
    }
}

impl Default for BackendMode {
    fn default() -> Self {
        Self::Simulated {
            ticks: DEFAULT_SIMULATED_TICKS,
        }
    }
}

/// Options recognized by the job controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Upper bound on the wait before each poll tick.
    #[serde(with = "crate::schedule::millis")]
    pub poll_interval: Duration,
    /// Poll attempts allowed before the job times out.
    pub max_attempts: u32,
    pub schedule: PollSchedule,
    /// Progress reported once submission succeeds.
    pub progress_floor: u8,
    /// Highest heuristic progress before completion is confirmed.
    pub progress_ceiling: u8,
    pub progress_curve: ProgressCurve,
    pub backend: BackendMode,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            schedule: PollSchedule::Fixed,
            progress_floor: DEFAULT_FLOOR,
            progress_ceiling: DEFAULT_CEILING,
            progress_curve: ProgressCurve::Linear,
            backend: BackendMode::default(),
        }
    }
}

impl ControllerConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_schedule(mut self, schedule: PollSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_progress(mut self, floor: u8, ceiling: u8, curve: ProgressCurve) -> Self {
        self.progress_floor = floor;
        self.progress_ceiling = ceiling;
        self.progress_curve = curve;
        self
    }

    pub fn with_backend(mut self, backend: BackendMode) -> Self {
        self.backend = backend;
        self
    }

    /// Worst-case time a job can spend polling, saturating at
    /// [`Duration::MAX`].
    pub fn timeout_bound(&self) -> Duration {
        self.poll_interval.saturating_mul(self.max_attempts)
    }

    /// Build the progress estimator described by this configuration.
    pub fn estimator(&self) -> Result<ProgressEstimator, ConfigError> {
        ProgressEstimator::new(
            self.progress_floor,
            self.progress_ceiling,
            self.progress_curve,
        )
    }

    /// Check every field. Called by every constructor that accepts a config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "poll interval must be positive".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        self.schedule.validate()?;
        self.estimator()?;
        match &self.backend {
            BackendMode::Http { base_url } if base_url.trim().is_empty() => Err(
                ConfigError::Invalid("backend base URL must not be empty".to_string()),
            ),
            BackendMode::Simulated { ticks: 0 } => Err(ConfigError::Invalid(
                "simulated backend needs at least 1 tick".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                          |
    /// |------------------------------|----------------------------------|
    /// | `GENJOB_POLL_INTERVAL_MS`    | `5000`                           |
    /// | `GENJOB_MAX_ATTEMPTS`        | `60`                             |
    /// | `GENJOB_BACKOFF_INITIAL_MS`  | unset (fixed schedule)           |
    /// | `GENJOB_BACKOFF_MULTIPLIER`  | `2.0` (only with initial set)    |
    /// | `GENJOB_PROGRESS_FLOOR`      | `10`                             |
    /// | `GENJOB_PROGRESS_CEILING`    | `95`                             |
    /// | `GENJOB_BACKEND_URL`         | unset (simulated backend)        |
    /// | `GENJOB_USE_SIMULATED`       | `false` when a URL is set        |
    /// | `GENJOB_SIMULATED_TICKS`     | `5`                              |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let poll_interval_ms: u64 = parse_var(&lookup, "GENJOB_POLL_INTERVAL_MS")?
            .unwrap_or(DEFAULT_POLL_INTERVAL.as_millis() as u64);
        let max_attempts: u32 =
            parse_var(&lookup, "GENJOB_MAX_ATTEMPTS")?.unwrap_or(DEFAULT_MAX_ATTEMPTS);

        let schedule = match parse_var::<u64, _>(&lookup, "GENJOB_BACKOFF_INITIAL_MS")? {
            Some(initial_ms) => PollSchedule::Backoff {
                initial: Duration::from_millis(initial_ms),
                multiplier: parse_var(&lookup, "GENJOB_BACKOFF_MULTIPLIER")?.unwrap_or(2.0),
            },
            None => PollSchedule::Fixed,
        };

        let progress_floor: u8 =
            parse_var(&lookup, "GENJOB_PROGRESS_FLOOR")?.unwrap_or(DEFAULT_FLOOR);
        let progress_ceiling: u8 =
            parse_var(&lookup, "GENJOB_PROGRESS_CEILING")?.unwrap_or(DEFAULT_CEILING);

        let base_url = lookup("GENJOB_BACKEND_URL").filter(|s| !s.trim().is_empty());
        let force_simulated: bool =
            parse_var(&lookup, "GENJOB_USE_SIMULATED")?.unwrap_or(base_url.is_none());
        let backend = match base_url {
            Some(base_url) if !force_simulated => BackendMode::Http { base_url },
            _ => BackendMode::Simulated {
                ticks: parse_var(&lookup, "GENJOB_SIMULATED_TICKS")?
                    .unwrap_or(DEFAULT_SIMULATED_TICKS),
            },
        };

        let config = Self {
            poll_interval: Duration::from_millis(poll_interval_ms),
            max_attempts,
            schedule,
            progress_floor,
            progress_ceiling,
            progress_curve: ProgressCurve::Linear,
            backend,
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value: raw }),
    }
}
