//! Write request/result shapes for the event store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use entrylog_core::{Actor, CorrelationId, EntityId, EventId, Payload};

use crate::{EventType, EventTypeError};

/// Why an [`EventWriteRequest`] was refused before touching storage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestValidationError {
    #[error(transparent)]
    EventType(#[from] EventTypeError),

    #[error("entity_id must not be nil")]
    NilEntityId,

    #[error("entity_type must not be empty")]
    EmptyEntityType,

    #[error("actor {0} must not be empty")]
    EmptyActorField(&'static str),
}

/// Request to append one event.
///
/// `previous_payload` is set by the correction workflow only; everything
/// else arrives from whichever operation is writing. The store assigns the
/// event id, sequence number and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWriteRequest {
    pub entity_id: EntityId,
    pub entity_type: String,
    pub event_type: EventType,
    pub payload: Payload,
    pub previous_payload: Option<Payload>,
    pub actor: Actor,
    pub correlation_id: Option<CorrelationId>,
    pub causation_id: Option<EventId>,
    pub context: Option<Payload>,
}

impl EventWriteRequest {
    pub fn new(
        entity_id: EntityId,
        entity_type: impl Into<String>,
        event_type: EventType,
        payload: Payload,
        actor: Actor,
    ) -> Self {
        Self {
            entity_id,
            entity_type: entity_type.into(),
            event_type,
            payload,
            previous_payload: None,
            actor,
            correlation_id: None,
            causation_id: None,
            context: None,
        }
    }

    pub fn with_correlation(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn with_causation(mut self, causation_id: EventId) -> Self {
        self.causation_id = Some(causation_id);
        self
    }

    pub fn with_previous_payload(mut self, previous: Payload) -> Self {
        self.previous_payload = Some(previous);
        self
    }

    pub fn with_context(mut self, context: Payload) -> Self {
        self.context = Some(context);
        self
    }

    /// Check required fields before any storage work happens.
    ///
    /// The event type itself is already well-formed by construction; this
    /// guards the identifiers and actor fields the store would otherwise
    /// persist blindly.
    pub fn validate(&self) -> Result<(), RequestValidationError> {
        if self.entity_id.is_nil() {
            return Err(RequestValidationError::NilEntityId);
        }
        if self.entity_type.is_empty() {
            return Err(RequestValidationError::EmptyEntityType);
        }
        if self.actor.username.is_empty() {
            return Err(RequestValidationError::EmptyActorField("username"));
        }
        if self.actor.role.is_empty() {
            return Err(RequestValidationError::EmptyActorField("role"));
        }
        Ok(())
    }
}

/// Caller-facing outcome of a write attempt.
///
/// Storage-level failures are reported through `success: false` plus a
/// boundary-safe `error_message`; the fold+validate+append sequence is safe
/// to retry as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWriteResult {
    pub event_id: EventId,
    pub entity_id: EntityId,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub error_message: Option<String>,
}

impl EventWriteResult {
    pub fn success(
        event_id: EventId,
        entity_id: EntityId,
        event_type: EventType,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id,
            entity_id,
            event_type,
            timestamp,
            success: true,
            error_message: None,
        }
    }

    pub fn failure(
        entity_id: EntityId,
        event_type: EventType,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            entity_id,
            event_type,
            timestamp: Utc::now(),
            success: false,
            error_message: Some(error_message.into()),
        }
    }
}
