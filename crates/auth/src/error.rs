//! Policy layer errors.

use thiserror::Error;

/// Failures of the policy machinery itself.
///
/// A deny is **not** an error; it comes back as a regular
/// [`AccessDecision`](crate::AccessDecision) with `allowed: false`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// Scope string had fewer than two colon-separated segments.
    #[error("invalid scope format: {0}")]
    InvalidScopeFormat(String),

    /// Role string is not part of the closed role set.
    #[error("unknown role: '{0}'")]
    UnknownRole(String),
}
