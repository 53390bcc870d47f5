use std::fmt;

use serde::Serialize;

/// Cache key: an entity kind plus the canonical JSON of everything that
/// shapes the result (scope, filters, page).
///
/// Object keys are serialized in sorted order, so structurally equal inputs
/// always produce equal keys.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    kind: String,
    parts: Vec<String>,
}

impl QueryKey {
    #[must_use]
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_owned(),
            parts: Vec::new(),
        }
    }

    /// Append one component. Values that fail to serialize become `null`.
    #[must_use]
    pub fn with<P: Serialize + ?Sized>(mut self, part: &P) -> Self {
        let canonical = serde_json::to_value(part).unwrap_or(serde_json::Value::Null);
        self.parts.push(canonical.to_string());
        self
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }
}

impl fmt::Debug for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.parts.join(", "))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn map_order_does_not_matter() {
        let a: HashMap<&str, i32> = [("page", 1), ("limit", 10)].into();
        let b: HashMap<&str, i32> = [("limit", 10), ("page", 1)].into();
        assert_eq!(QueryKey::new("licenses").with(&a), QueryKey::new("licenses").with(&b));
    }

    #[test]
    fn kind_and_parts_distinguish_keys() {
        let base = QueryKey::new("licenses").with("scope-a");
        assert_ne!(base, QueryKey::new("equipment").with("scope-a"));
        assert_ne!(base, QueryKey::new("licenses").with("scope-b"));
        assert_eq!(format!("{base:?}"), "licenses[\"scope-a\"]");
    }
}
