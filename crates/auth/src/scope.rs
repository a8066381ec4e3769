//! Scope values: parsed permission descriptors.

use serde::{Deserialize, Serialize};

use crate::PolicyError;

/// A permission grant on a resource.
///
/// The wire format is colon-delimited: `resource:action[:filter]`.
/// Constraints are **not** part of the string format; they are attached
/// per role-scope definition in the static policy table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Scope identifier as granted in tokens, e.g. `data:read:own`.
    pub id: String,
    pub resource: String,
    pub action: String,
    /// Optional resource filter (`own`, `all`).
    pub filter: Option<String>,
    /// Optional additional constraint (`unconfirmed`).
    pub constraint: Option<String>,
}

impl Scope {
    /// Build a scope from its parts; the id is derived.
    pub fn new(resource: &str, action: &str) -> Self {
        Self {
            id: format!("{resource}:{action}"),
            resource: resource.to_string(),
            action: action.to_string(),
            filter: None,
            constraint: None,
        }
    }

    pub fn with_filter(mut self, filter: &str) -> Self {
        self.id = format!("{}:{}:{filter}", self.resource, self.action);
        self.filter = Some(filter.to_string());
        self
    }

    pub fn with_constraint(mut self, constraint: &str) -> Self {
        self.constraint = Some(constraint.to_string());
        self
    }

    /// Parse a token-level scope string.
    ///
    /// Fewer than two colon segments (or an empty segment) is invalid.
    pub fn parse(scope_id: &str) -> Result<Self, PolicyError> {
        let parts: Vec<&str> = scope_id.split(':').collect();
        if parts.len() < 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(PolicyError::InvalidScopeFormat(scope_id.to_string()));
        }

        Ok(Self {
            id: scope_id.to_string(),
            resource: parts[0].to_string(),
            action: parts[1].to_string(),
            filter: parts.get(2).filter(|f| !f.is_empty()).map(|f| f.to_string()),
            constraint: None,
        })
    }

    /// Does this scope cover the given resource and action?
    pub fn matches(&self, resource: &str, action: &str) -> bool {
        self.resource == resource && self.action == action
    }
}

impl core::fmt::Display for Scope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.id)
    }
}
