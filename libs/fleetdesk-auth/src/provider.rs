use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use fleetdesk_backend::{AuthBackendRef, AuthUser, BackendError, Session, SignUpRequest};
use fleetdesk_security::{Profile, SecurityContext};
use fleetdesk_utils::SecretString;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::AuthError;

/// An authenticated session together with the user's profile.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub session: Session,
    pub profile: Profile,
}

impl SignedIn {
    #[must_use]
    pub fn security_context(&self) -> SecurityContext {
        SecurityContext::builder()
            .profile(self.profile.clone())
            .access_token(self.session.access_token.clone())
            .build()
    }
}

/// Outcome of [`SessionProvider::register`].
#[derive(Debug, Clone)]
pub enum Registration {
    SignedIn(Arc<SignedIn>),
    /// The account exists but must be confirmed by email first.
    ConfirmationPending,
}

/// Receives the current session every time it changes.
pub type SessionWatch = watch::Receiver<Option<Arc<SignedIn>>>;

/// Owns the current session and keeps subscribers informed about it.
///
/// Reads go through `ArcSwapOption` and never block; every change is also
/// published on a watch channel.
pub struct SessionProvider {
    backend: AuthBackendRef,
    current: ArcSwapOption<SignedIn>,
    changes: watch::Sender<Option<Arc<SignedIn>>>,
}

impl fmt::Debug for SessionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionProvider")
            .field("signed_in", &self.current.load().is_some())
            .finish_non_exhaustive()
    }
}

impl SessionProvider {
    #[must_use]
    pub fn new(backend: AuthBackendRef) -> Self {
        let (changes, _) = watch::channel(None);
        Self {
            backend,
            current: ArcSwapOption::empty(),
            changes,
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<Arc<SignedIn>> {
        self.current.load_full()
    }

    /// Context for data calls; anonymous when nobody is signed in.
    #[must_use]
    pub fn security_context(&self) -> SecurityContext {
        self.current()
            .map_or_else(SecurityContext::anonymous, |s| s.security_context())
    }

    #[must_use]
    pub fn subscribe(&self) -> SessionWatch {
        self.changes.subscribe()
    }

    /// Sign in with email and password, then load the profile.
    ///
    /// # Errors
    /// [`AuthError::InvalidCredentials`] when the backend rejects the pair,
    /// [`AuthError::ProfileUnavailable`] when the profile row cannot be read.
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Arc<SignedIn>, AuthError> {
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(AuthError::Validation("password is required".to_owned()));
        }

        let session = self
            .backend
            .sign_in_with_password(&email, password)
            .await
            .map_err(AuthError::from_sign_in)?;
        self.establish(session).await
    }

    /// Create an account. Signs in right away unless the backend requires
    /// email confirmation.
    ///
    /// # Errors
    /// Validation and backend failures.
    pub async fn register(&self, mut request: SignUpRequest) -> Result<Registration, AuthError> {
        request.email = normalize_email(&request.email)?;
        if request.password.is_empty() {
            return Err(AuthError::Validation("password is required".to_owned()));
        }

        match self.backend.sign_up(&request).await? {
            Some(session) => Ok(Registration::SignedIn(self.establish(session).await?)),
            None => {
                info!(email = %request.email, "registration pending email confirmation");
                Ok(Registration::ConfirmationPending)
            }
        }
    }

    /// Sign out. The local session is cleared even when the backend call
    /// fails; that failure is still reported.
    ///
    /// # Errors
    /// The backend's sign-out error.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let Some(previous) = self.current.swap(None) else {
            debug!("logout without an active session");
            return Ok(());
        };
        self.changes.send_replace(None);
        info!(user_id = %previous.profile.id, "signed out");

        self.backend
            .sign_out(&previous.session.access_token)
            .await
            .map_err(|err| {
                warn!(error = %err, "remote sign-out failed");
                AuthError::from(err)
            })
    }

    /// Ask the backend to send a password reset email.
    ///
    /// # Errors
    /// Validation and backend failures.
    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email)?;
        self.backend.reset_password_for_email(&email).await?;
        info!(email = %email, "password reset requested");
        Ok(())
    }

    /// Resume a session from a stored access token.
    ///
    /// # Errors
    /// [`AuthError::InvalidCredentials`] when the token is no longer valid.
    pub async fn restore(&self, access_token: SecretString) -> Result<Arc<SignedIn>, AuthError> {
        let user: AuthUser = self
            .backend
            .get_user(&access_token)
            .await
            .map_err(AuthError::from_sign_in)?;
        let session = Session {
            access_token,
            refresh_token: None,
            expires_in: None,
            user,
        };
        self.establish(session).await
    }

    /// Reload the profile of the signed-in user, e.g. after an admin edits it.
    ///
    /// # Errors
    /// [`AuthError::NotSignedIn`] without a session.
    pub async fn refresh_profile(&self) -> Result<Arc<SignedIn>, AuthError> {
        let current = self.current().ok_or(AuthError::NotSignedIn)?;
        let profile = self
            .backend
            .fetch_profile(&current.session)
            .await
            .map_err(|e| profile_error(&e))?;
        Ok(self.publish(SignedIn {
            session: current.session.clone(),
            profile,
        }))
    }

    async fn establish(&self, session: Session) -> Result<Arc<SignedIn>, AuthError> {
        let profile = match self.backend.fetch_profile(&session).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!(user_id = %session.user.id, error = %err, "profile unavailable, dropping session");
                if let Err(sign_out) = self.backend.sign_out(&session.access_token).await {
                    debug!(error = %sign_out, "sign-out after failed profile load");
                }
                return Err(profile_error(&err));
            }
        };
        info!(user_id = %profile.id, role = %profile.role, "signed in");
        Ok(self.publish(SignedIn { session, profile }))
    }

    fn publish(&self, signed_in: SignedIn) -> Arc<SignedIn> {
        let signed_in = Arc::new(signed_in);
        self.current.store(Some(Arc::clone(&signed_in)));
        self.changes.send_replace(Some(Arc::clone(&signed_in)));
        signed_in
    }
}

fn profile_error(err: &BackendError) -> AuthError {
    AuthError::ProfileUnavailable(err.message())
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::Validation(format!("invalid email address: '{email}'")));
    }
    Ok(email.to_ascii_lowercase())
}
