#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
pub mod access_scope;
pub mod capabilities;
pub mod context;
pub mod permission;
pub mod policy_engine;
pub mod profile;
pub mod resolver;

pub use access_scope::AccessScope;
pub use capabilities::Capabilities;
pub use context::SecurityContext;
pub use permission::{Action, Permission, Resource};
pub use policy_engine::{DenyAllPolicyEngine, PolicyEngine, PolicyEngineRef, RolePolicyEngine};
pub use profile::{Profile, Role, UnknownRole};
pub use resolver::PermissionResolver;
