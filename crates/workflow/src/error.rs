//! Workflow error taxonomy.

use thiserror::Error;

use entrylog_core::EntityId;

use crate::EntryState;

/// Deterministic workflow failures.
///
/// Every variant maps to a stable kind the boundary can branch on; reason
/// strings are safe to surface as-is (no storage internals ever leak in).
/// None of these are retryable except `Conflict`, where re-reading state
/// and re-running the operation is always safe.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The entity has no events at all.
    #[error("data entry not found: {0}")]
    EntityNotFound(EntityId),

    /// The requested event is not a legal edge from the current state.
    #[error("cannot apply '{event_type}' to entry in state '{current}'")]
    InvalidTransition {
        current: EntryState,
        event_type: String,
    },

    /// The actor's role does not satisfy the edge's required role.
    #[error("role '{role}' not allowed to apply this transition. Required: '{required}'")]
    UnauthorizedRole { role: String, required: String },

    /// Malformed input (empty rejection reason, bad event type, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Another writer advanced the entity's stream mid-operation.
    /// Re-fold and retry.
    #[error("concurrent update detected: {0}")]
    Conflict(String),

    /// The event store could not be read. Bounded-time failure, surfaced
    /// instead of hanging; retry once storage recovers.
    #[error("event store unavailable: {0}")]
    Store(String),
}

impl WorkflowError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
