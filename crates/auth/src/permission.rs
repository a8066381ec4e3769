//! Permission requests and access decisions.

use serde::{Deserialize, Serialize};

/// One authorization question: may `role` do `action` on `resource`?
///
/// Ephemeral: built per request, never persisted. The optional fields
/// carry the resource context that filters and constraints evaluate
/// against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub resource: String,
    pub action: String,
    pub resource_id: Option<String>,
    pub owner_id: Option<String>,
    pub resource_status: Option<String>,
}

impl PermissionRequest {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
            resource_id: None,
            owner_id: None,
            resource_status: None,
        }
    }

    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_status(mut self, resource_status: impl Into<String>) -> Self {
        self.resource_status = Some(resource_status.into());
        self
    }
}

/// Result of a policy evaluation. Ephemeral; typically handed to the
/// audit logger by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: String,
    pub matched_scope: Option<String>,
}

impl AccessDecision {
    pub fn allow(reason: impl Into<String>, matched_scope: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
            matched_scope: Some(matched_scope.into()),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            matched_scope: None,
        }
    }
}
