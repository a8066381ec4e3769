//! Workflow orchestration: fold, validate, append.
//!
//! Every operation runs the same pipeline:
//!
//! ```text
//! load events → fold current state → transition-table validation
//!             → role check → append new event (optimistic guard)
//! ```
//!
//! The append carries `ExpectedVersion::Exact(event_count)` from the fold,
//! so transition validation and the resulting append are effectively atomic
//! per entity: a concurrent writer makes the append fail with `Conflict`
//! instead of producing contradictory successor events.
//!
//! Corrections never mutate history: the new event embeds the full folded
//! payload as `previous_data` (and as the record's `previous_payload`), so
//! the pre-correction state stays permanently recoverable.

use serde_json::{json, Value as JsonValue};
use tracing::{info, warn};

use entrylog_core::{Actor, CorrelationId, EntityId, ExpectedVersion, Payload};
use entrylog_events::{CurrentState, EventType, EventWriteRequest, EventWriteResult};
use entrylog_workflow::{validate, EntryState, WorkflowError};

use crate::event_store::{EventStore, EventStoreError};

const ENTITY_TYPE: &str = "data_entry";

/// Lifecycle operations over one event store.
#[derive(Debug)]
pub struct WorkflowService<S> {
    store: S,
}

impl<S> WorkflowService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> WorkflowService<S>
where
    S: EventStore,
{
    /// Create a new data entry in `draft` state.
    ///
    /// Generates the entity id and a fresh correlation id; the only way
    /// this fails is input validation or a storage write failure.
    pub fn create_entry(
        &self,
        data: JsonValue,
        entry_type: &str,
        actor: &Actor,
    ) -> Result<EventWriteResult, WorkflowError> {
        let entry_id = EntityId::new();

        let mut payload = Payload::new();
        payload.insert("data".to_string(), data);
        payload.insert("entry_type".to_string(), json!(entry_type));
        payload.insert("state".to_string(), json!(EntryState::Draft));

        let request = EventWriteRequest::new(
            entry_id,
            ENTITY_TYPE,
            event_type("data.created")?,
            payload,
            actor.clone(),
        )
        .with_correlation(CorrelationId::new());

        self.append(request, ExpectedVersion::Exact(0))
    }

    /// Submit a draft (or corrected) entry for review.
    pub fn submit_entry(
        &self,
        entry_id: EntityId,
        actor: &Actor,
    ) -> Result<EventWriteResult, WorkflowError> {
        let current = self.load_state(entry_id)?;
        validate(entry_state(&current)?, "data.submitted", &actor.role)?;

        let mut payload = Payload::new();
        payload.insert("state".to_string(), json!(EntryState::Submitted));
        payload.insert("submitted_by".to_string(), json!(actor.username));

        self.append_next(entry_id, "data.submitted", payload, &current, actor)
    }

    /// Confirm a submitted entry.
    pub fn confirm_entry(
        &self,
        entry_id: EntityId,
        note: Option<&str>,
        actor: &Actor,
    ) -> Result<EventWriteResult, WorkflowError> {
        let current = self.load_state(entry_id)?;
        validate(entry_state(&current)?, "data.confirmed", &actor.role)?;

        let mut payload = Payload::new();
        payload.insert("state".to_string(), json!(EntryState::Confirmed));
        payload.insert("confirmed_by".to_string(), json!(actor.username));
        payload.insert("confirmation_note".to_string(), json!(note));

        self.append_next(entry_id, "data.confirmed", payload, &current, actor)
    }

    /// Reject a submitted entry. The reason is required and non-empty.
    pub fn reject_entry(
        &self,
        entry_id: EntityId,
        reason: &str,
        actor: &Actor,
    ) -> Result<EventWriteResult, WorkflowError> {
        if reason.trim().is_empty() {
            return Err(WorkflowError::validation("rejection_reason must not be empty"));
        }

        let current = self.load_state(entry_id)?;
        validate(entry_state(&current)?, "data.rejected", &actor.role)?;

        let mut payload = Payload::new();
        payload.insert("state".to_string(), json!(EntryState::Rejected));
        payload.insert("rejected_by".to_string(), json!(actor.username));
        payload.insert("rejection_reason".to_string(), json!(reason));

        self.append_next(entry_id, "data.rejected", payload, &current, actor)
    }

    /// Correct a confirmed or rejected entry.
    ///
    /// Writes a new event whose payload embeds the corrected fields and the
    /// full folded payload as it stood before the correction; the original
    /// events are untouched.
    pub fn correct_entry(
        &self,
        entry_id: EntityId,
        corrected_data: JsonValue,
        fields_corrected: &[String],
        note: &str,
        actor: &Actor,
    ) -> Result<EventWriteResult, WorkflowError> {
        let current = self.load_state(entry_id)?;
        validate(entry_state(&current)?, "data.corrected", &actor.role)?;

        let previous = current.payload.clone();

        let mut payload = Payload::new();
        payload.insert("state".to_string(), json!(EntryState::Corrected));
        payload.insert("corrected_data".to_string(), corrected_data);
        payload.insert("fields_corrected".to_string(), json!(fields_corrected));
        payload.insert("correction_note".to_string(), json!(note));
        payload.insert("corrected_by".to_string(), json!(actor.username));
        payload.insert("previous_data".to_string(), JsonValue::Object(previous.clone()));

        let request = EventWriteRequest::new(
            entry_id,
            ENTITY_TYPE,
            event_type("data.corrected")?,
            payload,
            actor.clone(),
        )
        .with_correlation(CorrelationId::new())
        .with_previous_payload(previous);

        self.append(request, ExpectedVersion::Exact(current.event_count as u64))
    }

    /// Cancel a submitted or rejected entry. Terminal: nothing follows.
    pub fn cancel_entry(
        &self,
        entry_id: EntityId,
        actor: &Actor,
    ) -> Result<EventWriteResult, WorkflowError> {
        let current = self.load_state(entry_id)?;
        validate(entry_state(&current)?, "data.cancelled", &actor.role)?;

        let mut payload = Payload::new();
        payload.insert("state".to_string(), json!(EntryState::Cancelled));
        payload.insert("cancelled_by".to_string(), json!(actor.username));

        self.append_next(entry_id, "data.cancelled", payload, &current, actor)
    }

    /// Current folded state of an entry.
    pub fn current_state(&self, entry_id: EntityId) -> Result<CurrentState, WorkflowError> {
        self.load_state(entry_id)
    }

    fn load_state(&self, entry_id: EntityId) -> Result<CurrentState, WorkflowError> {
        match self.store.current_state(entry_id, ENTITY_TYPE) {
            Ok(state) => Ok(state),
            Err(EventStoreError::EntityNotFound) => Err(WorkflowError::EntityNotFound(entry_id)),
            Err(other) => Err(WorkflowError::Store(other.to_string())),
        }
    }

    fn append_next(
        &self,
        entry_id: EntityId,
        event_type_raw: &str,
        payload: Payload,
        current: &CurrentState,
        actor: &Actor,
    ) -> Result<EventWriteResult, WorkflowError> {
        let request = EventWriteRequest::new(
            entry_id,
            ENTITY_TYPE,
            event_type(event_type_raw)?,
            payload,
            actor.clone(),
        )
        .with_correlation(CorrelationId::new());

        self.append(request, ExpectedVersion::Exact(current.event_count as u64))
    }

    fn append(
        &self,
        request: EventWriteRequest,
        expected_version: ExpectedVersion,
    ) -> Result<EventWriteResult, WorkflowError> {
        let entity_id = request.entity_id;
        let event_type = request.event_type.clone();

        match self.store.append(request, expected_version) {
            Ok(record) => {
                info!(
                    event_id = %record.event_id,
                    event_type = %record.event_type,
                    entity_id = %record.entity_id,
                    actor = %record.actor.username,
                    "workflow event appended"
                );
                Ok(EventWriteResult::success(
                    record.event_id,
                    record.entity_id,
                    record.event_type,
                    record.timestamp,
                ))
            }
            Err(EventStoreError::Validation(msg)) => Err(WorkflowError::Validation(msg)),
            Err(EventStoreError::Concurrency(msg)) => Err(WorkflowError::conflict(msg)),
            Err(EventStoreError::EntityNotFound) => Err(WorkflowError::EntityNotFound(entity_id)),
            // Storage-level write failure: reported in the result shape,
            // retryable as a whole fold+validate+append.
            Err(err @ (EventStoreError::WriteFailed(_) | EventStoreError::ReadFailed(_))) => {
                warn!(
                    entity_id = %entity_id,
                    event_type = %event_type,
                    error = %err,
                    "failed to write workflow event"
                );
                Ok(EventWriteResult::failure(entity_id, event_type, err.to_string()))
            }
        }
    }
}

fn event_type(raw: &str) -> Result<EventType, WorkflowError> {
    EventType::parse(raw).map_err(|e| WorkflowError::validation(e.to_string()))
}

/// Read the lifecycle state out of a folded payload.
///
/// A stream with events but no `state` key folds to `draft` (the state the
/// first event carries from creation onwards).
fn entry_state(current: &CurrentState) -> Result<EntryState, WorkflowError> {
    match current.state_str() {
        None => Ok(EntryState::Draft),
        Some(raw) => raw
            .parse()
            .map_err(|_| WorkflowError::validation(format!("unknown entry state: '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entrylog_core::UserId;
    use serde_json::json;

    use crate::event_store::InMemoryEventStore;

    fn operator() -> Actor {
        Actor::new(UserId::new(), "operator", "op1")
    }

    fn supervisor() -> Actor {
        Actor::new(UserId::new(), "supervisor", "sup1")
    }

    fn admin() -> Actor {
        Actor::new(UserId::new(), "admin", "root")
    }

    fn service() -> WorkflowService<InMemoryEventStore> {
        WorkflowService::new(InMemoryEventStore::new())
    }

    fn created(service: &WorkflowService<InMemoryEventStore>) -> EntityId {
        service
            .create_entry(json!({"temperature": 21.5}), "sensor_reading", &operator())
            .unwrap()
            .entity_id
    }

    #[test]
    fn created_entry_folds_to_draft_with_one_event() {
        let service = service();
        let entry_id = created(&service);

        let state = service.current_state(entry_id).unwrap();
        assert_eq!(state.state_str(), Some("draft"));
        assert_eq!(state.event_count, 1);
        assert_eq!(state.data(), Some(&json!({"temperature": 21.5})));
    }

    #[test]
    fn submit_then_confirm_walks_the_lifecycle() {
        let service = service();
        let entry_id = created(&service);

        service.submit_entry(entry_id, &operator()).unwrap();
        assert_eq!(
            service.current_state(entry_id).unwrap().state_str(),
            Some("submitted")
        );

        let result = service.confirm_entry(entry_id, Some("ok"), &supervisor()).unwrap();
        assert!(result.success);
        assert_eq!(
            service.current_state(entry_id).unwrap().state_str(),
            Some("confirmed")
        );
    }

    #[test]
    fn confirm_from_draft_is_an_invalid_transition() {
        let service = service();
        let entry_id = created(&service);

        let err = service.confirm_entry(entry_id, None, &supervisor()).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidTransition {
                current: EntryState::Draft,
                event_type: "data.confirmed".to_string(),
            }
        );
    }

    #[test]
    fn operator_cannot_confirm_a_submitted_entry() {
        let service = service();
        let entry_id = created(&service);
        service.submit_entry(entry_id, &operator()).unwrap();

        let err = service.confirm_entry(entry_id, None, &operator()).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::UnauthorizedRole {
                role: "operator".to_string(),
                required: "supervisor".to_string(),
            }
        );
    }

    #[test]
    fn admin_satisfies_any_required_role() {
        let service = service();
        let entry_id = created(&service);

        service.submit_entry(entry_id, &admin()).unwrap();
        service.confirm_entry(entry_id, None, &admin()).unwrap();
        assert_eq!(
            service.current_state(entry_id).unwrap().state_str(),
            Some("confirmed")
        );
    }

    #[test]
    fn reject_requires_a_reason() {
        let service = service();
        let entry_id = created(&service);
        service.submit_entry(entry_id, &operator()).unwrap();

        let err = service.reject_entry(entry_id, "  ", &supervisor()).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        let result = service
            .reject_entry(entry_id, "missing calibration record", &supervisor())
            .unwrap();
        assert!(result.success);
        assert_eq!(
            service.current_state(entry_id).unwrap().state_str(),
            Some("rejected")
        );
    }

    #[test]
    fn correction_preserves_the_pre_correction_payload() {
        let service = service();
        let entry_id = created(&service);
        service.submit_entry(entry_id, &operator()).unwrap();
        service.confirm_entry(entry_id, Some("looks right"), &supervisor()).unwrap();

        let before = service.current_state(entry_id).unwrap();
        let events_before = service
            .store()
            .list_for_entity(entry_id, "data_entry", 100)
            .unwrap();

        let result = service
            .correct_entry(
                entry_id,
                json!({"temperature": 20.9}),
                &["temperature".to_string()],
                "sensor drift",
                &supervisor(),
            )
            .unwrap();
        assert!(result.success);

        let events_after = service
            .store()
            .list_for_entity(entry_id, "data_entry", 100)
            .unwrap();

        // Prior events are byte-for-byte untouched.
        assert_eq!(&events_after[..events_before.len()], &events_before[..]);

        let correction = events_after.last().unwrap();
        assert_eq!(
            correction.payload.get("previous_data"),
            Some(&JsonValue::Object(before.payload.clone()))
        );
        assert_eq!(correction.previous_payload.as_ref(), Some(&before.payload));
        assert_eq!(
            service.current_state(entry_id).unwrap().state_str(),
            Some("corrected")
        );
    }

    #[test]
    fn corrected_entries_can_be_resubmitted_and_reconfirmed() {
        let service = service();
        let entry_id = created(&service);
        service.submit_entry(entry_id, &operator()).unwrap();
        service.confirm_entry(entry_id, None, &supervisor()).unwrap();
        service
            .correct_entry(entry_id, json!({}), &[], "fix", &supervisor())
            .unwrap();

        // From corrected, resubmission requires supervisor.
        let err = service.submit_entry(entry_id, &operator()).unwrap_err();
        assert!(matches!(err, WorkflowError::UnauthorizedRole { .. }));

        service.submit_entry(entry_id, &supervisor()).unwrap();
        service.confirm_entry(entry_id, None, &supervisor()).unwrap();
        assert_eq!(
            service.current_state(entry_id).unwrap().state_str(),
            Some("confirmed")
        );
    }

    #[test]
    fn cancelled_is_terminal() {
        let service = service();
        let entry_id = created(&service);
        service.submit_entry(entry_id, &operator()).unwrap();
        service.cancel_entry(entry_id, &operator()).unwrap();

        let err = service.submit_entry(entry_id, &operator()).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidTransition {
                current: EntryState::Cancelled,
                event_type: "data.submitted".to_string(),
            }
        );
    }

    #[test]
    fn operations_on_unknown_entries_are_not_found() {
        let service = service();
        let missing = EntityId::new();

        assert_eq!(
            service.submit_entry(missing, &operator()).unwrap_err(),
            WorkflowError::EntityNotFound(missing)
        );
        assert_eq!(
            service.confirm_entry(missing, None, &supervisor()).unwrap_err(),
            WorkflowError::EntityNotFound(missing)
        );
        assert_eq!(
            service
                .correct_entry(missing, json!({}), &[], "n", &supervisor())
                .unwrap_err(),
            WorkflowError::EntityNotFound(missing)
        );
    }

    #[test]
    fn rejected_entries_can_be_cancelled_by_operator() {
        let service = service();
        let entry_id = created(&service);
        service.submit_entry(entry_id, &operator()).unwrap();
        service.reject_entry(entry_id, "bad data", &supervisor()).unwrap();

        service.cancel_entry(entry_id, &operator()).unwrap();
        assert_eq!(
            service.current_state(entry_id).unwrap().state_str(),
            Some("cancelled")
        );
    }

    #[test]
    fn create_result_carries_the_event_identity() {
        let service = service();
        let result = service
            .create_entry(json!({"a": 1}), "manual", &operator())
            .unwrap();

        assert!(result.success);
        assert_eq!(result.event_type.as_str(), "data.created");
        let stored = service.store().get_by_id(result.event_id).unwrap().unwrap();
        assert_eq!(stored.entity_id, result.entity_id);
        assert!(stored.correlation_id.is_some());
    }
}
