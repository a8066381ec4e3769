//! `entrylog-auth` — default-deny ABAC policy engine.
//!
//! Pure decision layer, decoupled from HTTP and storage. Token signature
//! and expiry verification happen outside this crate; what arrives here is
//! an already-verified identity tuple plus the permission being asked for.

pub mod error;
pub mod identity;
pub mod permission;
pub mod policy;
pub mod role;
pub mod scope;

pub use error::PolicyError;
pub use identity::VerifiedIdentity;
pub use permission::{AccessDecision, PermissionRequest};
pub use policy::PolicyEngine;
pub use role::Role;
pub use scope::Scope;
