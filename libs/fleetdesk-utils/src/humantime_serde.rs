//! Serde support for `std::time::Duration` in humantime format (`"5m"`, `"1h 30m"`).
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Timeouts {
//!     #[serde(with = "fleetdesk_utils::humantime_serde")]
//!     request: Duration,
//! }
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserializer, Serializer, de};

/// # Errors
/// Fails when the input is not a humantime duration string.
pub fn deserialize<'de, D>(d: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    d.deserialize_str(DurationVisitor)
}

/// # Errors
/// Propagates serializer errors.
pub fn serialize<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&humantime::format_duration(*d).to_string())
}

struct DurationVisitor;

impl de::Visitor<'_> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a duration such as \"30s\" or \"5m\"")
    }

    fn visit_str<E>(self, v: &str) -> Result<Duration, E>
    where
        E: de::Error,
    {
        humantime::parse_duration(v).map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Window {
        #[serde(with = "super")]
        stale: Duration,
    }

    #[test]
    fn parses_and_formats() {
        let w: Window = serde_json::from_str(r#"{"stale": "5m"}"#).unwrap();
        assert_eq!(w.stale, Duration::from_secs(300));
        assert_eq!(serde_json::to_string(&w).unwrap(), r#"{"stale":"5m"}"#);
    }

    #[test]
    fn zero_is_accepted() {
        let w: Window = serde_json::from_str(r#"{"stale": "0s"}"#).unwrap();
        assert_eq!(w.stale, Duration::ZERO);
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<Window>(r#"{"stale": "soon"}"#).is_err());
    }
}
