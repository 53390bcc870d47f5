use fleetdesk_backend::BackendError;
use inventory_sdk::InventoryError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("not signed in")]
    Unauthenticated,

    #[error("not allowed to {action} {resource}")]
    Forbidden {
        resource: &'static str,
        action: &'static str,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("malformed {entity} row: {message}")]
    Decode {
        entity: &'static str,
        message: String,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl DomainError {
    /// Session missing or rejected by the backend.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        match self {
            Self::Unauthenticated => true,
            Self::Backend(err) => err.is_auth(),
            _ => false,
        }
    }
}

impl From<fleetdesk_query::Error> for DomainError {
    fn from(err: fleetdesk_query::Error) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<DomainError> for InventoryError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Unauthenticated => InventoryError::Unauthenticated,
            DomainError::Forbidden { .. } => InventoryError::Forbidden(err.to_string()),
            DomainError::NotFound { entity, id } => InventoryError::NotFound { entity, id },
            DomainError::Validation(message) => InventoryError::Validation(message),
            DomainError::Decode { .. } => InventoryError::backend(err.to_string(), false),
            DomainError::Backend(backend) => match backend {
                BackendError::Auth(_) => InventoryError::Unauthenticated,
                BackendError::Status { status: 403, message } => InventoryError::Forbidden(message),
                other => InventoryError::backend(other.message(), other.is_retryable()),
            },
        }
    }
}
