use std::collections::BTreeSet;

use serde::Serialize;
use uuid::Uuid;

use crate::access_scope::AccessScope;
use crate::permission::{Action, Permission, Resource};
use crate::profile::Role;

/// Capability descriptor derived from one identity.
///
/// Produced by [`crate::PermissionResolver`]; immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    role: Option<Role>,
    scope: AccessScope,
    granted: BTreeSet<(Resource, Action)>,
}

impl Capabilities {
    #[must_use]
    pub fn new(role: Option<Role>, scope: AccessScope, granted: BTreeSet<(Resource, Action)>) -> Self {
        Self {
            role,
            scope,
            granted,
        }
    }

    /// Descriptor for an unauthenticated identity.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::new(None, AccessScope::deny_all(), BTreeSet::new())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.role.is_some()
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    #[must_use]
    pub fn can_view_all_data(&self) -> bool {
        self.scope.can_view_all()
    }

    /// Client the identity is restricted to, if any.
    #[must_use]
    pub fn client_access(&self) -> Option<Uuid> {
        self.scope.owner_filter()
    }

    #[must_use]
    pub fn can(&self, action: Action, resource: Resource) -> bool {
        self.granted.contains(&(resource, action))
    }

    #[must_use]
    pub fn scope(&self) -> &AccessScope {
        &self.scope
    }

    /// Granted permissions in `resource:action` form, sorted.
    #[must_use]
    pub fn permissions(&self) -> Vec<Permission> {
        self.granted
            .iter()
            .map(|(r, a)| Permission::of(*r, *a))
            .collect()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_cannot_do_anything() {
        let caps = Capabilities::unauthenticated();
        assert!(!caps.is_authenticated());
        assert!(!caps.can_view_all_data());
        assert_eq!(caps.client_access(), None);
        for resource in Resource::ALL {
            for action in Action::ALL {
                assert!(!caps.can(action, resource));
            }
        }
    }

    #[test]
    fn permissions_are_listed_in_order() {
        let granted = BTreeSet::from([
            (Resource::Licenses, Action::View),
            (Resource::Clients, Action::View),
        ]);
        let caps = Capabilities::new(Some(Role::Client), AccessScope::owner(Uuid::nil()), granted);
        let listed: Vec<String> = caps.permissions().iter().map(ToString::to_string).collect();
        assert_eq!(listed, vec!["clients:view", "licenses:view"]);
    }
}
