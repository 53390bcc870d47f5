use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by a backend implementation.
///
/// `Clone` so a single failure can be shared by every caller awaiting the same
/// in-flight request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Connection, DNS or TLS failure
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx response; `message` is the backend's own error text
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Credentials rejected, token expired or session missing
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("failed to decode backend response: {0}")]
    Decode(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid backend configuration: {0}")]
    Config(String),
}

impl BackendError {
    /// Whether repeating the same request may succeed.
    ///
    /// Transport failures, timeouts, 408, 429 and 5xx are retryable.
    /// Authentication, decoding and other client errors are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Transport(_) | BackendError::Timeout(_) => true,
            BackendError::Status { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            BackendError::Auth(_)
            | BackendError::Decode(_)
            | BackendError::NotFound(_)
            | BackendError::Config(_) => false,
        }
    }

    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, BackendError::Auth(_))
    }

    /// Human-readable message without the variant prefix.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            BackendError::Transport(m)
            | BackendError::Auth(m)
            | BackendError::Decode(m)
            | BackendError::NotFound(m)
            | BackendError::Config(m)
            | BackendError::Status { message: m, .. } => m.clone(),
            BackendError::Timeout(d) => format!("request timed out after {d:?}"),
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(BackendError::Transport("reset".into()).is_retryable());
        assert!(BackendError::Timeout(Duration::from_secs(1)).is_retryable());
        for status in [408, 429, 500, 503] {
            let err = BackendError::Status {
                status,
                message: String::new(),
            };
            assert!(err.is_retryable(), "{status}");
        }
        for status in [400, 404, 409] {
            let err = BackendError::Status {
                status,
                message: String::new(),
            };
            assert!(!err.is_retryable(), "{status}");
        }
        assert!(!BackendError::Auth("JWT expired".into()).is_retryable());
    }

    #[test]
    fn message_is_the_backend_text() {
        let err = BackendError::Status {
            status: 400,
            message: "column licenses.foo does not exist".into(),
        };
        assert_eq!(err.message(), "column licenses.foo does not exist");
        assert_eq!(
            err.to_string(),
            "backend returned 400: column licenses.foo does not exist"
        );
    }
}
