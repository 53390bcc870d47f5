//! Error types for the inventory module.

use thiserror::Error;
use uuid::Uuid;

/// Errors returned by [`crate::InventoryClientV1`].
///
/// `Clone` so that one failed request can be handed to every caller that
/// was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("not signed in")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("validation error: {0}")]
    Validation(String),

    /// The backend rejected or failed the request; `message` is its own text.
    #[error("backend error: {message}")]
    Backend { message: String, retryable: bool },
}

impl InventoryError {
    #[must_use]
    pub fn backend(message: impl Into<String>, retryable: bool) -> Self {
        Self::Backend {
            message: message.into(),
            retryable,
        }
    }

    /// Only transient backend failures are worth another attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend { retryable: true, .. })
    }
}
