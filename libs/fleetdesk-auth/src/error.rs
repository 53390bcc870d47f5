use fleetdesk_backend::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Invalid input: {0}")]
    Validation(String),

    /// Signed in, but the profile row could not be loaded.
    #[error("Profile unavailable: {0}")]
    ProfileUnavailable(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl AuthError {
    /// Map a sign-in failure; rejected credentials get their own variant.
    pub(crate) fn from_sign_in(err: BackendError) -> Self {
        match err {
            BackendError::Auth(message) => Self::InvalidCredentials(message),
            other => Self::Backend(other),
        }
    }
}
