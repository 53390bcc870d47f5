use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Exponential backoff between retries of a failed query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExponentialBackoff {
    /// Delay before the first retry (default: 1s)
    #[serde(with = "fleetdesk_utils::humantime_serde")]
    pub initial: Duration,

    /// Upper bound for any single delay (default: 30s)
    #[serde(with = "fleetdesk_utils::humantime_serde")]
    pub max: Duration,

    /// Growth factor per attempt (default: 2.0)
    pub multiplier: f64,

    /// Add 0-25% random delay to spread out retries (default: true)
    pub jitter: bool,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl ExponentialBackoff {
    /// No jitter and millisecond delays; for tests.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            initial: Duration::from_millis(1),
            max: Duration::from_millis(100),
            multiplier: 2.0,
            jitter: false,
        }
    }

    /// Delay before retry number `attempt` (0-based).
    ///
    /// Non-finite or negative settings fall back to safe values instead of panicking.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        const MAX_BACKOFF_SECS: f64 = 86400.0;

        let attempt = i32::try_from(attempt).unwrap_or(i32::MAX);
        let multiplier = if self.multiplier.is_finite() && self.multiplier >= 0.0 {
            self.multiplier
        } else {
            1.0
        };
        let max_secs = self.max.as_secs_f64().min(MAX_BACKOFF_SECS);

        let base = self.initial.as_secs_f64() * multiplier.powi(attempt);
        let clamped = if base.is_finite() {
            base.clamp(0.0, max_secs)
        } else {
            max_secs
        };
        let mut delay = Duration::from_secs_f64(clamped);

        if self.jitter {
            let factor = rand::rng().random_range(0.0..=0.25);
            delay += delay.mul_f64(factor);
        }
        delay.min(Duration::from_secs_f64(max_secs))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn grows_exponentially_without_jitter() {
        let b = ExponentialBackoff {
            jitter: false,
            ..ExponentialBackoff::default()
        };
        assert_eq!(b.delay(0), Duration::from_secs(1));
        assert_eq!(b.delay(1), Duration::from_secs(2));
        assert_eq!(b.delay(2), Duration::from_secs(4));
        assert_eq!(b.delay(10), Duration::from_secs(30));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let b = ExponentialBackoff::default();
        for _ in 0..50 {
            let d = b.delay(1);
            assert!(d >= Duration::from_secs(2));
            assert!(d <= Duration::from_millis(2500));
        }
    }

    #[test]
    fn survives_nonsense_multiplier() {
        let b = ExponentialBackoff {
            multiplier: f64::NAN,
            jitter: false,
            ..ExponentialBackoff::default()
        };
        assert_eq!(b.delay(5), Duration::from_secs(1));
    }
}
