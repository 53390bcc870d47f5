#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Inventory SDK
//!
//! Public contract of the `inventory` module:
//!
//! - [`InventoryClientV1`] - API trait for consumers
//! - [`Client`], [`License`], [`Equipment`] and their insert payloads
//! - [`ClientFilter`], [`LicenseFilter`], [`EquipmentFilter`]
//! - [`LicenseStats`], [`EquipmentStats`], [`ClientStats`], [`Dashboard`]
//! - [`InventoryError`]
//! - [`schema`] - typed column references for building queries

pub mod api;
pub mod error;
pub mod filters;
pub mod models;
pub mod schema;
pub mod stats;

pub use api::InventoryClientV1;
pub use error::InventoryError;
pub use filters::{ClientFilter, EquipmentFilter, LicenseFilter};
pub use models::{
    Client, Equipment, EquipmentStatus, EquipmentType, License, LicenseStatus, NewClient,
    NewEquipment, NewLicense, Owned, UnknownValue,
};
pub use stats::{
    ClientStats, Dashboard, DashboardSection, EquipmentStats, LicenseStats, MonthlyExpiry,
};
