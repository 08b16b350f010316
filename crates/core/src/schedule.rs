//! Delay between consecutive poll ticks.
//!
//! The fixed schedule waits the full poll interval before every tick. The
//! backoff schedule starts short and grows geometrically, but is clamped to
//! the poll interval, so `max_attempts * poll_interval` remains the
//! worst-case wall-clock bound either way.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How long to wait before each poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PollSchedule {
    /// Every tick waits exactly the poll interval.
    #[default]
    Fixed,
    /// First tick waits `initial`, each later one `multiplier` times longer,
    /// never more than the poll interval.
    Backoff {
        #[serde(with = "millis")]
        initial: Duration,
        multiplier: f64,
    },
}

impl PollSchedule {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Fixed => Ok(()),
            Self::Backoff {
                initial,
                multiplier,
            } => {
                if initial.is_zero() {
                    return Err(ConfigError::Invalid(
                        "backoff initial delay must be positive".to_string(),
                    ));
                }
                if !multiplier.is_finite() || multiplier < 1.0 {
                    return Err(ConfigError::Invalid(format!(
                        "backoff multiplier must be >= 1.0, got {multiplier}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Delay before the first tick.
    pub fn first_delay(&self, interval: Duration) -> Duration {
        match *self {
            Self::Fixed => interval,
            Self::Backoff { initial, .. } => initial.min(interval),
        }
    }

    /// Delay before the tick following one that waited `current`.
    pub fn next_delay(&self, current: Duration, interval: Duration) -> Duration {
        match *self {
            Self::Fixed => interval,
            Self::Backoff { multiplier, .. } => {
                let next_ms = (current.as_millis() as f64 * multiplier) as u64;
                Duration::from_millis(next_ms).min(interval)
            }
        }
    }
}

pub(crate) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
