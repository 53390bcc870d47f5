use std::fmt;
use std::str::FromStr;

/// Resources guarded by the console.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Clients,
    Licenses,
    Equipment,
    Dashboard,
    Users,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Clients,
        Resource::Licenses,
        Resource::Equipment,
        Resource::Dashboard,
        Resource::Users,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Clients => "clients",
            Resource::Licenses => "licenses",
            Resource::Equipment => "equipment",
            Resource::Dashboard => "dashboard",
            Resource::Users => "users",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::View, Action::Create, Action::Update, Action::Delete];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown resource: {s}"))
    }
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown action: {s}"))
    }
}

/// A grant of one action on a set of resources.
///
/// Serializes to `"{resource_pattern}:{action}"`; either side may be `*`.
/// Examples:
///  - `"licenses:view"`
///  - `"*:view"`
///  - `"*:*"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    /// Resource name, `*`, or a prefix ending in `*`.
    pub(crate) resource_pattern: String,
    /// Action name or `*`.
    pub(crate) action: String,
}

impl Permission {
    #[must_use]
    pub fn builder() -> PermissionBuilder {
        PermissionBuilder::default()
    }

    /// Shorthand for a concrete grant; never fails.
    #[must_use]
    pub fn of(resource: Resource, action: Action) -> Self {
        Self {
            resource_pattern: resource.as_str().to_owned(),
            action: action.as_str().to_owned(),
        }
    }

    #[must_use]
    pub fn resource_pattern(&self) -> &str {
        &self.resource_pattern
    }

    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    #[must_use]
    pub fn matches(&self, resource: Resource, action: Action) -> bool {
        let resource_ok = match self.resource_pattern.strip_suffix('*') {
            Some(prefix) => resource.as_str().starts_with(prefix),
            None => self.resource_pattern == resource.as_str(),
        };
        resource_ok && (self.action == "*" || self.action == action.as_str())
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_pattern, self.action)
    }
}

impl serde::Serialize for Permission {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Permission {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let Some((resource, action)) = s.split_once(':') else {
            return Err(serde::de::Error::custom(format!(
                "Expected format 'resource_pattern:action', got: {s}"
            )));
        };
        Permission::builder()
            .resource_pattern(resource)
            .action(action)
            .build()
            .map_err(serde::de::Error::custom)
    }
}

fn valid_token(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '*')
}

#[derive(Default)]
pub struct PermissionBuilder {
    resource_pattern: Option<String>,
    action: Option<String>,
}

impl PermissionBuilder {
    #[must_use]
    pub fn resource_pattern(mut self, resource_pattern: &str) -> Self {
        self.resource_pattern = Some(resource_pattern.to_owned());
        self
    }

    #[must_use]
    pub fn action(mut self, action: &str) -> Self {
        self.action = Some(action.to_owned());
        self
    }

    /// Build the permission
    ///
    /// # Errors
    ///
    /// Returns an error if either part is missing or contains characters other
    /// than alphanumerics, underscores or `*`.
    pub fn build(self) -> anyhow::Result<Permission> {
        let resource_pattern = self
            .resource_pattern
            .ok_or_else(|| anyhow::anyhow!("resource_pattern is required"))?;
        let action = self
            .action
            .ok_or_else(|| anyhow::anyhow!("action is required"))?;

        if !valid_token(&resource_pattern) {
            return Err(anyhow::anyhow!(
                "Resource pattern must contain only alphanumeric characters, underscores, or '*', got: {resource_pattern}"
            ));
        }
        if !valid_token(&action) {
            return Err(anyhow::anyhow!(
                "Action must contain only alphanumeric characters, underscores, or '*', got: {action}"
            ));
        }

        Ok(Permission {
            resource_pattern,
            action,
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_both_parts() {
        let err = Permission::builder().action("view").build().unwrap_err();
        assert!(err.to_string().contains("resource_pattern is required"));
        let err = Permission::builder()
            .resource_pattern("licenses")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("action is required"));
    }

    #[test]
    fn builder_rejects_separators_in_action() {
        let result = Permission::builder()
            .resource_pattern("licenses")
            .action("view:all")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn serde_uses_compact_string_form() {
        let p = Permission::of(Resource::Licenses, Action::View);
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"licenses:view\"");

        let parsed: Permission = serde_json::from_str("\"*:view\"").unwrap();
        assert_eq!(parsed.resource_pattern(), "*");
        assert_eq!(parsed.action(), "view");
    }

    #[test]
    fn deserialize_rejects_missing_separator() {
        let result: Result<Permission, _> = serde_json::from_str("\"licenses\"");
        assert!(result.is_err());
    }

    #[test]
    fn wildcards_match() {
        let any_view: Permission = serde_json::from_str("\"*:view\"").unwrap();
        assert!(any_view.matches(Resource::Users, Action::View));
        assert!(!any_view.matches(Resource::Users, Action::Delete));

        let prefix: Permission = serde_json::from_str("\"lic*:*\"").unwrap();
        assert!(prefix.matches(Resource::Licenses, Action::Delete));
        assert!(!prefix.matches(Resource::Clients, Action::View));
    }

    #[test]
    fn resource_and_action_parse() {
        assert_eq!("equipment".parse::<Resource>().unwrap(), Resource::Equipment);
        assert_eq!("delete".parse::<Action>().unwrap(), Action::Delete);
        assert!("printers".parse::<Resource>().is_err());
    }
}
