use async_trait::async_trait;
use fleetdesk_security::{Profile, Role};
use fleetdesk_utils::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BackendError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Token pair returned by a successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: SecretString,
    #[serde(default)]
    pub refresh_token: Option<SecretString>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

/// Sign-up payload; the profile fields travel as user metadata and are used by
/// the backend to create the `profiles` row.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: SecretString,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub client_id: Option<Uuid>,
}

impl SignUpRequest {
    #[must_use]
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_owned(),
            password: SecretString::new(password),
            full_name: None,
            role: None,
            client_id: None,
        }
    }

    #[must_use]
    pub fn full_name(mut self, name: &str) -> Self {
        self.full_name = Some(name.to_owned());
        self
    }

    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    #[must_use]
    pub fn client_id(mut self, client_id: Uuid) -> Self {
        self.client_id = Some(client_id);
        self
    }
}

/// Authentication API of the hosted backend.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, BackendError>;

    /// Returns `None` when the account still needs email confirmation.
    async fn sign_up(&self, request: &SignUpRequest) -> Result<Option<Session>, BackendError>;

    async fn sign_out(&self, access_token: &SecretString) -> Result<(), BackendError>;

    async fn reset_password_for_email(&self, email: &str) -> Result<(), BackendError>;

    /// Validate a token and return its user.
    async fn get_user(&self, access_token: &SecretString) -> Result<AuthUser, BackendError>;

    /// Load the profile row of the session's user.
    async fn fetch_profile(&self, session: &Session) -> Result<Profile, BackendError>;
}
