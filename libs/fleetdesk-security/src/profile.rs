use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Technician,
    Client,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Technician => "technician",
            Role::Client => "client",
        }
    }

    /// Staff roles see every client's records.
    #[must_use]
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Technician)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "technician" => Ok(Role::Technician),
            "client" => Ok(Role::Client),
            other => Err(UnknownRole(other.to_owned())),
        }
    }
}

/// Identity row maintained by the backend (`profiles` table).
///
/// Created on sign-up and only ever read by this crate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub role: Role,
    /// Owning client for client-role identities.
    #[serde(default)]
    pub client_id: Option<Uuid>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl Profile {
    #[must_use]
    pub fn new(id: Uuid, role: Role) -> Self {
        Self {
            id,
            role,
            client_id: None,
            email: None,
            full_name: None,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client_id: Uuid) -> Self {
        self.client_id = Some(client_id);
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_owned());
        self
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn role_wire_values() {
        assert_eq!(serde_json::to_string(&Role::Technician).unwrap(), "\"technician\"");
        assert_eq!("client".parse::<Role>(), Ok(Role::Client));
        assert_eq!(
            "superuser".parse::<Role>(),
            Err(UnknownRole("superuser".to_owned()))
        );
    }

    #[test]
    fn profile_decodes_backend_row() {
        let row = serde_json::json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "role": "client",
            "client_id": "550e8400-e29b-41d4-a716-446655440001",
            "full_name": "Dana Ops",
            "created_at": "2026-01-01T00:00:00Z"
        });
        let profile: Profile = serde_json::from_value(row).unwrap();
        assert_eq!(profile.role, Role::Client);
        assert!(profile.client_id.is_some());
        assert_eq!(profile.email, None);
    }
}
