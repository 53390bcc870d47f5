#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Helpers shared by the console views.
pub mod debounce;
pub mod pager;
pub mod pagination;

pub use debounce::{Debouncer, SEARCH_DEBOUNCE};
pub use pager::{ItemsPager, PagesPager};
pub use pagination::PaginationState;
