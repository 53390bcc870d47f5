use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::access_scope::AccessScope;
use crate::capabilities::Capabilities;
use crate::context::SecurityContext;
use crate::permission::{Action, Resource};
use crate::policy_engine::PolicyEngineRef;
use crate::profile::{Profile, Role};

/// Turns the identity in a [`SecurityContext`] into [`Capabilities`].
///
/// The last result is memoized against the profile it was computed from:
/// resolving again with an unchanged profile returns the same `Arc`, so
/// consumers can compare descriptors by pointer to detect identity changes.
pub struct PermissionResolver {
    policy: PolicyEngineRef,
    last: Mutex<Option<(Option<Profile>, Arc<Capabilities>)>>,
}

impl PermissionResolver {
    #[must_use]
    pub fn new(policy: PolicyEngineRef) -> Self {
        Self {
            policy,
            last: Mutex::new(None),
        }
    }

    /// Resolve capabilities for `ctx`. Never fails; an unknown or incomplete
    /// identity only narrows what is allowed.
    pub fn resolve(&self, ctx: &SecurityContext) -> Arc<Capabilities> {
        let profile = ctx.profile().cloned();
        let mut last = self.last.lock();
        if let Some((cached_for, caps)) = last.as_ref()
            && *cached_for == profile
        {
            return Arc::clone(caps);
        }

        let caps = Arc::new(self.compute(ctx));
        debug!(
            role = ?caps.role(),
            can_view_all = caps.can_view_all_data(),
            client_access = ?caps.client_access(),
            "resolved capabilities"
        );
        *last = Some((profile, Arc::clone(&caps)));
        caps
    }

    fn compute(&self, ctx: &SecurityContext) -> Capabilities {
        let Some(profile) = ctx.profile() else {
            return Capabilities::unauthenticated();
        };

        let scope = scope_for(profile);
        let granted: BTreeSet<(Resource, Action)> = Resource::ALL
            .into_iter()
            .flat_map(|r| Action::ALL.into_iter().map(move |a| (r, a)))
            .filter(|(r, a)| self.policy.allows(ctx, *r, *a))
            .collect();

        Capabilities::new(Some(profile.role), scope, granted)
    }
}

fn scope_for(profile: &Profile) -> AccessScope {
    match profile.role {
        Role::Admin | Role::Technician => AccessScope::all(),
        Role::Client => match profile.client_id {
            Some(client_id) => AccessScope::owner(client_id),
            None => {
                debug!(profile_id = %profile.id, "client profile without client_id; denying data access");
                AccessScope::deny_all()
            }
        },
    }
}
