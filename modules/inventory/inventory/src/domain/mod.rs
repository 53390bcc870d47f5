//! Domain layer for the inventory module.

pub mod error;
pub mod local_client;
pub mod service;
pub mod stats;

pub use error::DomainError;
pub use local_client::InventoryLocalClient;
pub use service::Service;
