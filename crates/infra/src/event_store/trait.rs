use std::sync::Arc;

use thiserror::Error;

use entrylog_core::{EntityId, EventId, ExpectedVersion};
use entrylog_events::{fold, CurrentState, EventRecord, EventWriteRequest, RequestValidationError};

/// How many events one fold pass reads. Listing is finite by design; a
/// caller paging through history re-queries with its own limit.
pub const FOLD_LIST_LIMIT: usize = 1000;

/// Event store operation error.
///
/// Infrastructure failures only; workflow legality and role checks live
/// upstream. Reason strings are boundary-safe: a stable operation name at
/// most, never driver internals.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The write request was malformed; nothing was attempted.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The entity has no events.
    #[error("entity not found")]
    EntityNotFound,

    /// The stream moved past the expected version. Re-fold and retry.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// The store could not durably persist the event. The append is
    /// all-or-nothing, so retrying the whole fold+validate+append is safe.
    #[error("event write failed: {0}")]
    WriteFailed(String),

    #[error("event read failed: {0}")]
    ReadFailed(String),
}

impl From<RequestValidationError> for EventStoreError {
    fn from(value: RequestValidationError) -> Self {
        EventStoreError::Validation(value.to_string())
    }
}

/// Durable, ordered, immutable append-only event storage.
///
/// ## Contract
///
/// - `append` is atomic (the record is fully written or not at all) and
///   durable before returning success. Timestamps are assigned here and
///   are non-decreasing per `(entity_id, entity_type)` stream.
/// - `append` enforces the `expected_version` guard against the stream's
///   current event count, which serializes conflicting fold+append
///   sequences on the same entity.
/// - `list_for_entity` returns ascending timestamp order.
/// - No operation ever updates or deletes a stored event.
pub trait EventStore: Send + Sync {
    /// Validate, stamp and durably append one event.
    fn append(
        &self,
        request: EventWriteRequest,
        expected_version: ExpectedVersion,
    ) -> Result<EventRecord, EventStoreError>;

    /// Events for one entity in ascending timestamp order, at most `limit`.
    fn list_for_entity(
        &self,
        entity_id: EntityId,
        entity_type: &str,
        limit: usize,
    ) -> Result<Vec<EventRecord>, EventStoreError>;

    /// Point lookup by event id.
    fn get_by_id(&self, event_id: EventId) -> Result<Option<EventRecord>, EventStoreError>;

    /// Fold the entity's history into its current state.
    ///
    /// Zero events is `EntityNotFound`.
    fn current_state(
        &self,
        entity_id: EntityId,
        entity_type: &str,
    ) -> Result<CurrentState, EventStoreError> {
        let records = self.list_for_entity(entity_id, entity_type, FOLD_LIST_LIMIT)?;
        if records.is_empty() {
            return Err(EventStoreError::EntityNotFound);
        }
        Ok(fold(&records))
    }
}

impl<'a, S> EventStore for &'a S
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        request: EventWriteRequest,
        expected_version: ExpectedVersion,
    ) -> Result<EventRecord, EventStoreError> {
        (**self).append(request, expected_version)
    }

    fn list_for_entity(
        &self,
        entity_id: EntityId,
        entity_type: &str,
        limit: usize,
    ) -> Result<Vec<EventRecord>, EventStoreError> {
        (**self).list_for_entity(entity_id, entity_type, limit)
    }

    fn get_by_id(&self, event_id: EventId) -> Result<Option<EventRecord>, EventStoreError> {
        (**self).get_by_id(event_id)
    }

    fn current_state(
        &self,
        entity_id: EntityId,
        entity_type: &str,
    ) -> Result<CurrentState, EventStoreError> {
        (**self).current_state(entity_id, entity_type)
    }
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        request: EventWriteRequest,
        expected_version: ExpectedVersion,
    ) -> Result<EventRecord, EventStoreError> {
        (**self).append(request, expected_version)
    }

    fn list_for_entity(
        &self,
        entity_id: EntityId,
        entity_type: &str,
        limit: usize,
    ) -> Result<Vec<EventRecord>, EventStoreError> {
        (**self).list_for_entity(entity_id, entity_type, limit)
    }

    fn get_by_id(&self, event_id: EventId) -> Result<Option<EventRecord>, EventStoreError> {
        (**self).get_by_id(event_id)
    }

    fn current_state(
        &self,
        entity_id: EntityId,
        entity_type: &str,
    ) -> Result<CurrentState, EventStoreError> {
        (**self).current_state(entity_id, entity_type)
    }
}
