#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Session handling for the console: who is signed in, and telling
//! interested parties when that changes.
pub mod error;
pub mod provider;

pub use error::AuthError;
pub use provider::{Registration, SessionProvider, SessionWatch, SignedIn};
