//! Heuristic progress estimation for poll-only backends.
//!
//! Backends in this domain rarely report real progress, so the percentage
//! shown to users is derived from how many poll attempts have elapsed. The
//! estimate starts at a floor (submission done), creeps toward a ceiling
//! below 100, and only confirmed completion reaches 100.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Progress reported once completion is confirmed.
pub const COMPLETE: u8 = 100;
/// Highest value a backend hint may produce.
pub const MAX_HINTED: u8 = 99;
/// Default progress right after a successful submission.
pub const DEFAULT_FLOOR: u8 = 10;
/// Default upper bound for heuristic estimates.
pub const DEFAULT_CEILING: u8 = 95;

/// Shape of the heuristic curve between floor and ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressCurve {
    /// Scales with `attempt / max_attempts`, reaching the ceiling on the
    /// last permitted attempt.
    #[default]
    Linear,
    /// Adds a constant `step` per attempt regardless of the attempt ceiling.
    FixedStep { step: u8 },
}

/// Maps elapsed poll attempts (and optional backend hints) to a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEstimator {
    floor: u8,
    ceiling: u8,
    curve: ProgressCurve,
}

impl ProgressEstimator {
    /// Create an estimator. Requires `floor <= ceiling < 100`.
    pub fn new(floor: u8, ceiling: u8, curve: ProgressCurve) -> Result<Self, ConfigError> {
        if ceiling >= COMPLETE {
            return Err(ConfigError::Invalid(format!(
                "progress ceiling must be below {COMPLETE}, got {ceiling}"
            )));
        }
        if floor > ceiling {
            return Err(ConfigError::Invalid(format!(
                "progress floor ({floor}) must not exceed ceiling ({ceiling})"
            )));
        }
        if let ProgressCurve::FixedStep { step: 0 } = curve {
            return Err(ConfigError::Invalid(
                "fixed progress step must be positive".to_string(),
            ));
        }
        Ok(Self {
            floor,
            ceiling,
            curve,
        })
    }

    /// Progress to show as soon as the backend has accepted the job.
    pub fn initial(&self) -> u8 {
        self.floor
    }

    pub fn ceiling(&self) -> u8 {
        self.ceiling
    }

    /// Estimate progress after `attempt` polls.
    ///
    /// The result is never lower than `previous`. A finite `hint` replaces
    /// the heuristic and is clamped to `[previous, 99]`; without one the
    /// value stays within `[floor, ceiling]`.
    pub fn estimate(&self, attempt: u32, max_attempts: u32, hint: Option<f64>, previous: u8) -> u8 {
        if let Some(hint) = hint.filter(|h| h.is_finite()) {
            let lo = previous.min(MAX_HINTED);
            return hint.round().clamp(f64::from(lo), f64::from(MAX_HINTED)) as u8;
        }
        self.heuristic(attempt, max_attempts).max(previous)
    }

    fn heuristic(&self, attempt: u32, max_attempts: u32) -> u8 {
        let span = u32::from(self.ceiling - self.floor);
        let gained = match self.curve {
            ProgressCurve::Linear => {
                if max_attempts == 0 {
                    span
                } else {
                    let done = u64::from(attempt.min(max_attempts));
                    (u64::from(span) * done / u64::from(max_attempts)) as u32
                }
            }
            ProgressCurve::FixedStep { step } => u32::from(step).saturating_mul(attempt),
        };
        let value = u32::from(self.floor) + gained.min(span);
        value as u8
    }
}

impl Default for ProgressEstimator {
    fn default() -> Self {
        Self {
            floor: DEFAULT_FLOOR,
            ceiling: DEFAULT_CEILING,
            curve: ProgressCurve::Linear,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- Construction --

    #[test]
    fn rejects_ceiling_at_complete() {
        assert!(ProgressEstimator::new(10, 100, ProgressCurve::Linear).is_err());
    }

    #[test]
    fn rejects_floor_above_ceiling() {
        assert!(ProgressEstimator::new(50, 40, ProgressCurve::Linear).is_err());
    }

    #[test]
    fn rejects_zero_step() {
        assert!(ProgressEstimator::new(10, 95, ProgressCurve::FixedStep { step: 0 }).is_err());
    }

    // -- Heuristic --

    #[test]
    fn linear_starts_at_floor_and_ends_at_ceiling() {
        let est = ProgressEstimator::default();
        assert_eq!(est.estimate(0, 60, None, 0), 10);
        assert_eq!(est.estimate(60, 60, None, 0), 95);
        assert_eq!(est.estimate(500, 60, None, 0), 95);
    }

    #[test]
    fn linear_midpoint() {
        let est = ProgressEstimator::default();
        // 10 + 85 * 30 / 60 = 52
        assert_eq!(est.estimate(30, 60, None, 0), 52);
    }

    #[test]
    fn linear_is_monotonic_over_attempts() {
        let est = ProgressEstimator::default();
        let mut previous = est.initial();
        for attempt in 1..=80 {
            let next = est.estimate(attempt, 60, None, previous);
            assert!(next >= previous, "attempt {attempt}: {next} < {previous}");
            assert!(next <= est.ceiling());
            previous = next;
        }
    }

    #[test]
    fn fixed_step_caps_at_ceiling() {
        let est = ProgressEstimator::new(10, 90, ProgressCurve::FixedStep { step: 15 }).unwrap();
        assert_eq!(est.estimate(1, 60, None, 0), 25);
        assert_eq!(est.estimate(2, 60, None, 0), 40);
        assert_eq!(est.estimate(10, 60, None, 0), 90);
    }

    #[test]
    fn huge_attempt_counts_stay_in_range() {
        let est = ProgressEstimator::default();
        assert_eq!(est.estimate(u32::MAX, u32::MAX, None, 0), 95);
        assert_eq!(est.estimate(u32::MAX / 2, u32::MAX, None, 0), 52);
        assert_eq!(est.estimate(u32::MAX, 60, None, 0), 95);

        let stepped =
            ProgressEstimator::new(10, 90, ProgressCurve::FixedStep { step: 200 }).unwrap();
        assert_eq!(stepped.estimate(u32::MAX, u32::MAX, None, 0), 90);
    }

    #[test]
    fn zero_max_attempts_goes_straight_to_ceiling() {
        let est = ProgressEstimator::default();
        assert_eq!(est.estimate(0, 0, None, 0), 95);
    }

    // -- Hints --

    #[test]
    fn hint_overrides_heuristic() {
        let est = ProgressEstimator::default();
        assert_eq!(est.estimate(1, 60, Some(70.0), 10), 70);
    }

    #[test]
    fn hint_never_goes_backwards() {
        let est = ProgressEstimator::default();
        assert_eq!(est.estimate(5, 60, Some(20.0), 40), 40);
    }

    #[test]
    fn hint_never_reaches_complete() {
        let est = ProgressEstimator::default();
        assert_eq!(est.estimate(5, 60, Some(100.0), 40), 99);
        assert_eq!(est.estimate(5, 60, Some(250.0), 40), 99);
    }

    #[test]
    fn non_finite_hint_is_ignored() {
        let est = ProgressEstimator::default();
        assert_eq!(est.estimate(30, 60, Some(f64::NAN), 0), 52);
    }

    #[test]
    fn previous_above_heuristic_is_kept() {
        let est = ProgressEstimator::default();
        assert_eq!(est.estimate(1, 60, None, 80), 80);
    }
}
