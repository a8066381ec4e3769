//! The verified identity tuple.

use serde::{Deserialize, Serialize};

use entrylog_core::{Actor, UserId};

use crate::Role;

/// Identity as delivered by the external token layer, **after** signature
/// and expiry verification. This crate trusts it as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
    /// Scope ids granted in the token, e.g. `["data:create", "data:read:own"]`.
    pub scopes: Vec<String>,
}

impl VerifiedIdentity {
    pub fn new(
        user_id: UserId,
        username: impl Into<String>,
        role: Role,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
            scopes,
        }
    }

    /// The actor triple written onto events and audit records.
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role.as_str(), self.username.clone())
    }
}
