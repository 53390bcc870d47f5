#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Port to the hosted backend-as-a-service.
//!
//! [`DataBackend`] and [`AuthBackend`] are the only way the rest of the
//! workspace talks to storage and authentication. Two implementations ship
//! here: [`RestBackend`] (PostgREST + GoTrue over HTTPS) and
//! [`InMemoryBackend`] (tests, demos).
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod memory;
pub mod realtime;
pub mod rest;

use std::sync::Arc;

pub use auth::{AuthBackend, AuthUser, Session, SignUpRequest};
pub use config::BackendConfig;
pub use data::{DataBackend, Row, SelectResult};
pub use error::BackendError;
pub use memory::InMemoryBackend;
pub use realtime::{ChangeEvent, ChangeHub, ChangeKind, ChangeSubscription};
pub use rest::RestBackend;

pub type DataBackendRef = Arc<dyn DataBackend>;
pub type AuthBackendRef = Arc<dyn AuthBackend>;
