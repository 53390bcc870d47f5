#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Query cache shared by every data hook of the console.
//!
//! One [`QueryCache`] per session keeps backend reads deduplicated and
//! fresh enough; see [`CachePolicy`] for the knobs.
pub mod backoff;
pub mod cache;
pub mod key;
pub mod policy;

pub use backoff::ExponentialBackoff;
pub use cache::{QueryCache, QueryResult};
pub use key::QueryKey;
pub use policy::{CachePolicy, RefetchTrigger};
