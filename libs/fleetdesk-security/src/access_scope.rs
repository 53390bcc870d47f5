use uuid::Uuid;

/// Which records an identity may read.
///
/// A scope that neither views all data nor names an owner is a "deny all"
/// scope; queries under it must not reach the backend.
#[derive(Clone, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct AccessScope {
    pub(crate) can_view_all: bool,
    pub(crate) owner_filter: Option<Uuid>,
}

impl AccessScope {
    #[must_use]
    pub fn all() -> Self {
        Self {
            can_view_all: true,
            owner_filter: None,
        }
    }

    #[must_use]
    pub fn owner(client_id: Uuid) -> Self {
        Self {
            can_view_all: false,
            owner_filter: Some(client_id),
        }
    }

    #[must_use]
    pub fn deny_all() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn can_view_all(&self) -> bool {
        self.can_view_all
    }

    /// Owner every visible record must belong to; `None` when unrestricted or denied.
    #[inline]
    #[must_use]
    pub fn owner_filter(&self) -> Option<Uuid> {
        if self.can_view_all {
            None
        } else {
            self.owner_filter
        }
    }

    #[must_use]
    pub fn is_denied(&self) -> bool {
        !self.can_view_all && self.owner_filter.is_none()
    }

    /// Whether a record owned by `owner` is visible under this scope.
    #[must_use]
    pub fn permits_owner(&self, owner: Option<Uuid>) -> bool {
        if self.can_view_all {
            return true;
        }
        matches!((self.owner_filter, owner), (Some(a), Some(b)) if a == b)
    }
}
