use fleetdesk_utils::SecretString;

use crate::profile::Profile;

/// Identity and credentials for one request or operation.
///
/// An anonymous context carries neither a profile nor a token; every data
/// operation treats it as "no access".
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    profile: Option<Profile>,
    access_token: Option<SecretString>,
}

impl SecurityContext {
    #[must_use]
    pub fn builder() -> SecurityContextBuilder {
        SecurityContextBuilder::default()
    }

    #[must_use]
    pub fn anonymous() -> Self {
        SecurityContextBuilder::default().build()
    }

    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Bearer token for backend calls, if signed in.
    #[must_use]
    pub fn access_token(&self) -> Option<&SecretString> {
        self.access_token.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.profile.is_some()
    }
}

#[derive(Default)]
pub struct SecurityContextBuilder {
    profile: Option<Profile>,
    access_token: Option<SecretString>,
}

impl SecurityContextBuilder {
    #[must_use]
    pub fn profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }

    #[must_use]
    pub fn access_token(mut self, token: SecretString) -> Self {
        self.access_token = Some(token);
        self
    }

    #[must_use]
    pub fn build(self) -> SecurityContext {
        SecurityContext {
            profile: self.profile,
            access_token: self.access_token,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::profile::Role;
    use uuid::Uuid;

    #[test]
    fn anonymous_has_nothing() {
        let ctx = SecurityContext::anonymous();
        assert!(!ctx.is_authenticated());
        assert!(ctx.profile().is_none());
        assert!(ctx.access_token().is_none());
    }

    #[test]
    fn debug_does_not_leak_token() {
        let ctx = SecurityContext::builder()
            .profile(Profile::new(Uuid::nil(), Role::Admin))
            .access_token(SecretString::new("jwt-abc"))
            .build();
        assert!(ctx.is_authenticated());
        assert!(!format!("{ctx:?}").contains("jwt-abc"));
        assert_eq!(ctx.access_token().map(SecretString::expose), Some("jwt-abc"));
    }
}
