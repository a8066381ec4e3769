//! Audit entry shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use entrylog_core::{Actor, AuditId, CorrelationId, EntityId, Payload};

/// Request-level metadata attached to an audit entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    pub request_id: Option<CorrelationId>,
    pub request_path: Option<String>,
    pub request_method: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// One audit entry, ready to be logged.
///
/// Captures who did what to which resource, whether it worked, and which
/// scope (if any) authorized it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub actor: Actor,

    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<EntityId>,

    /// The scope that granted permission, when the action was authorized.
    pub scope_granted: Option<String>,

    pub request: AuditContext,

    pub success: bool,
    pub error_message: Option<String>,
    pub status_code: Option<u16>,

    pub context: Option<Payload>,
}

impl AuditLogEntry {
    /// A successful action with no request metadata.
    pub fn action(actor: Actor, action: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            actor,
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            scope_granted: None,
            request: AuditContext::default(),
            success: true,
            error_message: None,
            status_code: None,
            context: None,
        }
    }

    pub fn with_resource(mut self, resource_id: EntityId) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope_granted = Some(scope.into());
        self
    }

    pub fn with_request(mut self, request: AuditContext) -> Self {
        self.request = request;
        self
    }

    pub fn failed(mut self, error_message: impl Into<String>) -> Self {
        self.success = false;
        self.error_message = Some(error_message.into());
        self
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_context(mut self, context: Payload) -> Self {
        self.context = Some(context);
        self
    }
}

/// A stored audit record: the entry plus its assigned id and timestamp.
/// Append-only; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub audit_id: AuditId,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub entry: AuditLogEntry,
}

#[cfg(test)]
mod tests {
    use super::*;
    use entrylog_core::UserId;

    #[test]
    fn builder_covers_failure_shape() {
        let actor = Actor::new(UserId::new(), "operator", "op1");
        let entry = AuditLogEntry::action(actor, "data.confirm", "data_entry")
            .with_resource(EntityId::new())
            .failed("role 'operator' not allowed")
            .with_status_code(403);

        assert!(!entry.success);
        assert_eq!(entry.status_code, Some(403));
        assert!(entry.error_message.as_deref().unwrap().contains("operator"));
        assert_eq!(entry.scope_granted, None);
    }

    #[test]
    fn successful_entry_defaults() {
        let actor = Actor::new(UserId::new(), "supervisor", "sup1");
        let entry = AuditLogEntry::action(actor, "data.create", "data_entry")
            .with_scope("data:create");

        assert!(entry.success);
        assert_eq!(entry.error_message, None);
        assert_eq!(entry.scope_granted.as_deref(), Some("data:create"));
    }
}
