use std::time::Duration;

use fleetdesk_utils::SecretString;
use serde::{Deserialize, Serialize};

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://abc.example.co`
    pub url: String,
    /// Public (anon) API key sent as `apikey` on every request
    pub anon_key: SecretString,
    /// Per-request timeout (default: 30s)
    #[serde(with = "fleetdesk_utils::humantime_serde")]
    pub request_timeout: Duration,
    /// Permit plain `http://` URLs; meant for local stacks and mock servers
    pub allow_insecure_http: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:54321".to_owned(),
            anon_key: SecretString::default(),
            request_timeout: Duration::from_secs(30),
            allow_insecure_http: false,
        }
    }
}

impl BackendConfig {
    #[must_use]
    pub fn new(url: &str, anon_key: &str) -> Self {
        Self {
            url: url.to_owned(),
            anon_key: SecretString::new(anon_key),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn allow_insecure_http(mut self) -> Self {
        self.allow_insecure_http = true;
        self
    }
}
