use std::collections::BTreeMap;

use crate::permission::{Action, Permission, Resource};
use crate::profile::Role;
use crate::SecurityContext;

/// Type alias for a reference-counted Policy Engine
pub type PolicyEngineRef = std::sync::Arc<dyn PolicyEngine>;

/// Decides whether the identity in a context may perform an action on a resource.
pub trait PolicyEngine: Send + Sync {
    fn allows(&self, ctx: &SecurityContext, resource: Resource, action: Action) -> bool;
}

/// Grants permissions by role.
///
/// The default grant table:
/// - `admin`: everything
/// - `technician`: view everything except users, create/update licenses and equipment
/// - `client`: view clients, licenses, equipment and the dashboard
#[derive(Debug, Clone)]
pub struct RolePolicyEngine {
    grants: BTreeMap<Role, Vec<Permission>>,
}

impl RolePolicyEngine {
    #[must_use]
    pub fn new(grants: BTreeMap<Role, Vec<Permission>>) -> Self {
        Self { grants }
    }

    #[must_use]
    pub fn default_grants() -> BTreeMap<Role, Vec<Permission>> {
        let viewer = [
            Resource::Clients,
            Resource::Licenses,
            Resource::Equipment,
            Resource::Dashboard,
        ]
        .map(|r| Permission::of(r, Action::View));

        let mut technician = viewer.to_vec();
        for resource in [Resource::Licenses, Resource::Equipment] {
            technician.push(Permission::of(resource, Action::Create));
            technician.push(Permission::of(resource, Action::Update));
        }

        let admin = Permission {
            resource_pattern: "*".to_owned(),
            action: "*".to_owned(),
        };

        BTreeMap::from([
            (Role::Admin, vec![admin]),
            (Role::Technician, technician),
            (Role::Client, viewer.to_vec()),
        ])
    }

    /// Replace the grants of one role.
    #[must_use]
    pub fn with_grants(mut self, role: Role, permissions: Vec<Permission>) -> Self {
        self.grants.insert(role, permissions);
        self
    }

    #[must_use]
    pub fn grants_for(&self, role: Role) -> &[Permission] {
        self.grants.get(&role).map_or(&[], Vec::as_slice)
    }
}

impl Default for RolePolicyEngine {
    fn default() -> Self {
        Self::new(Self::default_grants())
    }
}

impl PolicyEngine for RolePolicyEngine {
    fn allows(&self, ctx: &SecurityContext, resource: Resource, action: Action) -> bool {
        let Some(profile) = ctx.profile() else {
            return false;
        };
        self.grants_for(profile.role)
            .iter()
            .any(|p| p.matches(resource, action))
    }
}

/// Refuses everything; used when no policy is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAllPolicyEngine;

impl PolicyEngine for DenyAllPolicyEngine {
    fn allows(&self, _ctx: &SecurityContext, _resource: Resource, _action: Action) -> bool {
        false
    }
}
