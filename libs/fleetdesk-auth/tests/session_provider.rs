#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use fleetdesk_auth::{AuthError, Registration, SessionProvider};
use fleetdesk_backend::{AuthBackend, InMemoryBackend, SignUpRequest};
use fleetdesk_security::{Profile, Role};
use fleetdesk_utils::SecretString;
use uuid::Uuid;

fn setup() -> (Arc<InMemoryBackend>, SessionProvider, Profile) {
    let backend = Arc::new(InMemoryBackend::new());
    let profile = Profile::new(Uuid::new_v4(), Role::Client)
        .with_client(Uuid::new_v4())
        .with_email("dana@example.com");
    backend.add_user("dana@example.com", "s3cret", &profile);
    let provider = SessionProvider::new(backend.clone());
    (backend, provider, profile)
}

#[tokio::test]
async fn login_loads_profile_and_notifies_subscribers() {
    let (_backend, provider, profile) = setup();
    let mut changes = provider.subscribe();
    assert!(!provider.security_context().is_authenticated());

    let signed_in = provider
        .login("Dana@Example.com", &SecretString::new("s3cret"))
        .await
        .unwrap();

    assert_eq!(signed_in.profile.id, profile.id);
    assert_eq!(signed_in.profile.client_id, profile.client_id);
    let ctx = provider.security_context();
    assert!(ctx.is_authenticated());
    assert_eq!(ctx.profile().unwrap().role, Role::Client);

    changes.changed().await.unwrap();
    let seen = changes.borrow_and_update().clone().unwrap();
    assert!(Arc::ptr_eq(&seen, &signed_in));
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() {
    let (_backend, provider, _) = setup();
    let err = provider
        .login("dana@example.com", &SecretString::new("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials(_)));
    assert!(provider.current().is_none());
}

#[tokio::test]
async fn empty_inputs_never_reach_the_backend() {
    let (_backend, provider, _) = setup();
    let err = provider
        .login("dana@example.com", &SecretString::new(""))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));
    let err = provider.reset_password("not-an-email").await.unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));
}

#[tokio::test]
async fn logout_clears_session_and_publishes_none() {
    let (_backend, provider, _) = setup();
    provider
        .login("dana@example.com", &SecretString::new("s3cret"))
        .await
        .unwrap();
    let mut changes = provider.subscribe();

    provider.logout().await.unwrap();
    assert!(provider.current().is_none());
    assert!(!provider.security_context().is_authenticated());
    changes.changed().await.unwrap();
    assert!(changes.borrow().is_none());

    // Nothing left to sign out.
    provider.logout().await.unwrap();
}

#[tokio::test]
async fn logout_clears_locally_even_if_remote_fails() {
    let (backend, provider, _) = setup();
    let signed_in = provider
        .login("dana@example.com", &SecretString::new("s3cret"))
        .await
        .unwrap();
    // Revoke the token behind the provider's back.
    backend
        .sign_out(&signed_in.session.access_token)
        .await
        .unwrap();

    let err = provider.logout().await.unwrap_err();
    assert!(matches!(err, AuthError::Backend(_)));
    assert!(provider.current().is_none());
}

#[tokio::test]
async fn restore_resumes_from_token() {
    let (backend, provider, profile) = setup();
    let token = provider
        .login("dana@example.com", &SecretString::new("s3cret"))
        .await
        .unwrap()
        .session
        .access_token
        .clone();

    let fresh = SessionProvider::new(backend);
    let restored = fresh.restore(token).await.unwrap();
    assert_eq!(restored.profile.id, profile.id);

    let err = fresh
        .restore(SecretString::new("forged"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials(_)));
}

#[tokio::test]
async fn register_signs_in_or_waits_for_confirmation() {
    let backend = Arc::new(InMemoryBackend::new());
    let provider = SessionProvider::new(backend);
    let client_id = Uuid::new_v4();
    let outcome = provider
        .register(
            SignUpRequest::new("new@example.com", "pw")
                .full_name("New User")
                .client_id(client_id),
        )
        .await
        .unwrap();
    let Registration::SignedIn(signed_in) = outcome else {
        panic!("expected immediate sign-in");
    };
    assert_eq!(signed_in.profile.role, Role::Client);
    assert_eq!(signed_in.profile.client_id, Some(client_id));
    assert_eq!(signed_in.profile.full_name.as_deref(), Some("New User"));

    let confirming = SessionProvider::new(Arc::new(
        InMemoryBackend::new().require_email_confirmation(),
    ));
    let outcome = confirming
        .register(SignUpRequest::new("wait@example.com", "pw"))
        .await
        .unwrap();
    assert!(matches!(outcome, Registration::ConfirmationPending));
    assert!(confirming.current().is_none());
}

#[tokio::test]
async fn reset_password_is_forwarded() {
    let (backend, provider, _) = setup();
    provider.reset_password(" dana@example.com ").await.unwrap();
    assert_eq!(backend.reset_requests(), vec!["dana@example.com".to_owned()]);
}
