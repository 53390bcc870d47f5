#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use fleetdesk_security::{
    Action, DenyAllPolicyEngine, PermissionResolver, Profile, Resource, Role, RolePolicyEngine,
    SecurityContext,
};
use uuid::Uuid;

fn resolver() -> PermissionResolver {
    PermissionResolver::new(Arc::new(RolePolicyEngine::default()))
}

fn ctx_for(profile: Profile) -> SecurityContext {
    SecurityContext::builder().profile(profile).build()
}

#[test]
fn unauthenticated_resolves_to_nothing() {
    let caps = resolver().resolve(&SecurityContext::anonymous());
    assert!(!caps.is_authenticated());
    assert!(!caps.can_view_all_data());
    assert_eq!(caps.client_access(), None);
    assert!(!caps.can(Action::View, Resource::Dashboard));
    assert!(caps.scope().is_denied());
}

#[test]
fn staff_roles_view_all_data() {
    for role in [Role::Admin, Role::Technician] {
        let caps = resolver().resolve(&ctx_for(Profile::new(Uuid::new_v4(), role)));
        assert!(caps.can_view_all_data(), "{role}");
        assert_eq!(caps.client_access(), None);
    }
}

#[test]
fn client_role_is_scoped_to_its_client() {
    let c1 = Uuid::new_v4();
    let caps = resolver().resolve(&ctx_for(Profile::new(Uuid::new_v4(), Role::Client).with_client(c1)));
    assert!(!caps.can_view_all_data());
    assert_eq!(caps.client_access(), Some(c1));
    assert!(caps.can(Action::View, Resource::Licenses));
    assert!(!caps.can(Action::Create, Resource::Licenses));
}

#[test]
fn client_role_without_client_is_denied() {
    let caps = resolver().resolve(&ctx_for(Profile::new(Uuid::new_v4(), Role::Client)));
    assert!(caps.scope().is_denied());
    assert_eq!(caps.client_access(), None);
}

#[test]
fn unchanged_identity_returns_same_descriptor() {
    let resolver = resolver();
    let ctx = ctx_for(Profile::new(Uuid::new_v4(), Role::Technician));
    let first = resolver.resolve(&ctx);
    let second = resolver.resolve(&ctx.clone());
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(*first, *second);
}

#[test]
fn changed_identity_yields_new_descriptor() {
    let resolver = resolver();
    let id = Uuid::new_v4();
    let first = resolver.resolve(&ctx_for(Profile::new(id, Role::Client).with_client(Uuid::new_v4())));
    let second = resolver.resolve(&ctx_for(Profile::new(id, Role::Admin)));
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(second.can(Action::Delete, Resource::Users));

    let logged_out = resolver.resolve(&SecurityContext::anonymous());
    assert!(!logged_out.is_authenticated());
}

#[test]
fn deny_all_policy_keeps_scope_but_grants_nothing() {
    let resolver = PermissionResolver::new(Arc::new(DenyAllPolicyEngine));
    let caps = resolver.resolve(&ctx_for(Profile::new(Uuid::new_v4(), Role::Admin)));
    assert!(caps.can_view_all_data());
    assert!(caps.permissions().is_empty());
}
