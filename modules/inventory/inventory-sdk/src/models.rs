//! Inventory records as the console reads them.
//!
//! Records mirror backend rows of the read views, which add the owning
//! client's display name (`client_name`) to licenses and equipment.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A string that is not one of an enumeration's wire values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(UnknownValue {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

wire_enum! {
    /// Lifecycle state of a license.
    LicenseStatus, "license status" {
        Active => "active",
        Expired => "expired",
        AboutToExpire => "about_to_expire",
        Cancelled => "cancelled",
    }
}

wire_enum! {
    EquipmentType, "equipment type" {
        Pc => "pc",
        Server => "server",
        Router => "router",
        Switch => "switch",
        Printer => "printer",
        Other => "other",
    }
}

wire_enum! {
    /// Lifecycle state of a piece of equipment.
    EquipmentStatus, "equipment status" {
        Active => "active",
        InMaintenance => "in_maintenance",
        Obsolete => "obsolete",
        SoonObsolete => "soon_obsolete",
        Retired => "retired",
    }
}

/// Records that belong to a client.
pub trait Owned {
    fn owner_id(&self) -> Option<Uuid>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Owned for Client {
    fn owner_id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub client_id: Option<Uuid>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub license_key: Option<String>,
    pub status: LicenseStatus,
    #[serde(default)]
    pub seats: Option<i64>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Owned for License {
    fn owner_id(&self) -> Option<Uuid> {
        self.client_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub equipment_type: EquipmentType,
    pub status: EquipmentStatus,
    #[serde(default)]
    pub client_id: Option<Uuid>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub purchase_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_of_life_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Owned for Equipment {
    fn owner_id(&self) -> Option<Uuid> {
        self.client_id
    }
}

/// Insert payload for a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
}

/// Insert payload for a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLicense {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_key: Option<String>,
    pub status: LicenseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seats: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
}

impl Owned for NewLicense {
    fn owner_id(&self) -> Option<Uuid> {
        self.client_id
    }
}

/// Insert payload for equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEquipment {
    pub name: String,
    #[serde(rename = "type")]
    pub equipment_type: EquipmentType,
    pub status: EquipmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_of_life_date: Option<NaiveDate>,
}

impl Owned for NewEquipment {
    fn owner_id(&self) -> Option<Uuid> {
        self.client_id
    }
}
