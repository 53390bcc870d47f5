//! Inventory Module
//!
//! Permission-scoped access to clients, licenses and equipment on top of a
//! [`fleetdesk_backend::DataBackend`]:
//!
//! - [`domain::Service`] - scoped queries, mutations and aggregates
//! - [`domain::InventoryLocalClient`] - `InventoryClientV1` over the service
//! - [`CachedInventoryClient`] - read-through cache in front of any client
//! - [`RealtimeForwarder`] - turns backend row changes into cache invalidation
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod cached_client;
pub mod config;
pub mod domain;
pub mod module;
pub mod realtime;

pub use cached_client::CachedInventoryClient;
pub use config::{InventoryConfig, Relations};
pub use module::InventoryModule;
pub use realtime::RealtimeForwarder;
