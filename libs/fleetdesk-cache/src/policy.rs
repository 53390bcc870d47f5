use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backoff::ExponentialBackoff;

/// Environment events that may trigger a refetch of stale entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefetchTrigger {
    /// The console regained focus.
    Focus,
    /// Network connectivity came back.
    Reconnect,
}

/// Freshness, retention and retry settings of a [`crate::QueryCache`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CachePolicy {
    /// How long a fetched value is served without revalidation (default: 5m).
    /// `0s` revalidates on every read.
    #[serde(with = "fleetdesk_utils::humantime_serde")]
    pub stale_window: Duration,

    /// Entries not read for this long are evicted by `gc` (default: 10m).
    #[serde(with = "fleetdesk_utils::humantime_serde")]
    pub gc_window: Duration,

    pub refetch_triggers: BTreeSet<RefetchTrigger>,

    /// Retries after the first failed attempt (default: 3).
    pub max_retries: u32,

    pub backoff: ExponentialBackoff,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            stale_window: Duration::from_secs(5 * 60),
            gc_window: Duration::from_secs(10 * 60),
            refetch_triggers: BTreeSet::from([RefetchTrigger::Focus, RefetchTrigger::Reconnect]),
            max_retries: 3,
            backoff: ExponentialBackoff::default(),
        }
    }
}

impl CachePolicy {
    /// Revalidate on every read.
    #[must_use]
    pub fn always_revalidate() -> Self {
        Self {
            stale_window: Duration::ZERO,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_stale_window(mut self, window: Duration) -> Self {
        self.stale_window = window;
        self
    }

    #[must_use]
    pub fn with_gc_window(mut self, window: Duration) -> Self {
        self.gc_window = window;
        self
    }

    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, backoff: ExponentialBackoff) -> Self {
        self.max_retries = max_retries;
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub fn with_triggers(mut self, triggers: impl IntoIterator<Item = RefetchTrigger>) -> Self {
        self.refetch_triggers = triggers.into_iter().collect();
        self
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = CachePolicy::default();
        assert_eq!(p.stale_window, Duration::from_secs(300));
        assert_eq!(p.gc_window, Duration::from_secs(600));
        assert_eq!(p.max_retries, 3);
        assert!(p.refetch_triggers.contains(&RefetchTrigger::Focus));
    }

    #[test]
    fn deserializes_partial_config() {
        let p: CachePolicy = serde_json::from_value(serde_json::json!({
            "stale_window": "0s",
            "refetch_triggers": ["reconnect"],
            "backoff": {"initial": "250ms"}
        }))
        .unwrap();
        assert_eq!(p.stale_window, Duration::ZERO);
        assert_eq!(p.refetch_triggers, BTreeSet::from([RefetchTrigger::Reconnect]));
        assert_eq!(p.backoff.initial, Duration::from_millis(250));
        assert_eq!(p.backoff.max, Duration::from_secs(30));
        assert_eq!(p.gc_window, Duration::from_secs(600));
    }

    #[test]
    fn rejects_unknown_fields() {
        let result: Result<CachePolicy, _> =
            serde_json::from_value(serde_json::json!({"stale_time": "1m"}));
        assert!(result.is_err());
    }
}
