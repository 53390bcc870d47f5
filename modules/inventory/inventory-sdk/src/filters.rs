//! List filters.
//!
//! Enumerated fields are kept as raw strings: the query layer validates them
//! and ignores values outside the allowed set instead of failing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientFilter {
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseFilter {
    pub search: Option<String>,
    pub status: Option<String>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct EquipmentFilter {
    pub search: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub equipment_type: Option<String>,
    pub client_id: Option<Uuid>,
}

impl ClientFilter {
    #[must_use]
    pub fn search(mut self, text: &str) -> Self {
        self.search = Some(text.to_owned());
        self
    }
}

impl LicenseFilter {
    #[must_use]
    pub fn search(mut self, text: &str) -> Self {
        self.search = Some(text.to_owned());
        self
    }

    #[must_use]
    pub fn status(mut self, status: &str) -> Self {
        self.status = Some(status.to_owned());
        self
    }

    #[must_use]
    pub fn client(mut self, client_id: Uuid) -> Self {
        self.client_id = Some(client_id);
        self
    }
}

impl EquipmentFilter {
    #[must_use]
    pub fn search(mut self, text: &str) -> Self {
        self.search = Some(text.to_owned());
        self
    }

    #[must_use]
    pub fn status(mut self, status: &str) -> Self {
        self.status = Some(status.to_owned());
        self
    }

    #[must_use]
    pub fn equipment_type(mut self, equipment_type: &str) -> Self {
        self.equipment_type = Some(equipment_type.to_owned());
        self
    }

    #[must_use]
    pub fn client(mut self, client_id: Uuid) -> Self {
        self.client_id = Some(client_id);
        self
    }
}
