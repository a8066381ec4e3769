//! Actor identity carried on every event and audit record.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Who performed an action.
///
/// The role is kept as a plain string here: events and audit records are
/// persisted facts, and the role vocabulary at write time must survive even
/// if the role set evolves. The policy layer owns the closed role enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: String,
    pub username: String,
}

impl Actor {
    pub fn new(id: UserId, role: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id,
            role: role.into(),
            username: username.into(),
        }
    }
}
