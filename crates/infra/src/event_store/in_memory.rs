use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use tracing::info;

use entrylog_core::{EntityId, EventId, ExpectedVersion};
use entrylog_events::{category_for, EventRecord, EventWriteRequest};

use super::r#trait::{EventStore, EventStoreError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    entity_id: EntityId,
    entity_type: String,
}

/// In-memory append-only event store.
///
/// Intended for tests/dev. The single `RwLock` write section makes the
/// version check and the append atomic per process, which is the same
/// guarantee the Postgres store gets from its transaction.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<StreamKey, Vec<EventRecord>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        request: EventWriteRequest,
        expected_version: ExpectedVersion,
    ) -> Result<EventRecord, EventStoreError> {
        request.validate()?;

        let key = StreamKey {
            entity_id: request.entity_id,
            entity_type: request.entity_type.clone(),
        };

        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::WriteFailed("lock poisoned".to_string()))?;

        let stream = streams.entry(key).or_default();
        let current = stream.len() as u64;

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        // Timestamps are non-decreasing within a stream: clamp to the last
        // event's timestamp when the clock reads earlier.
        let mut timestamp = Utc::now();
        if let Some(last) = stream.last() {
            if timestamp < last.timestamp {
                timestamp = last.timestamp;
            }
        }

        let record = EventRecord {
            event_id: EventId::new(),
            event_version: 1,
            entity_id: request.entity_id,
            entity_type: request.entity_type,
            event_category: category_for(&request.event_type),
            event_type: request.event_type,
            sequence_number: current + 1,
            payload: request.payload,
            previous_payload: request.previous_payload,
            actor: request.actor,
            correlation_id: request.correlation_id,
            causation_id: request.causation_id,
            timestamp,
            context: request.context,
        };

        stream.push(record.clone());

        info!(
            event_id = %record.event_id,
            event_type = %record.event_type,
            entity_id = %record.entity_id,
            actor = %record.actor.username,
            "event written"
        );

        Ok(record)
    }

    fn list_for_entity(
        &self,
        entity_id: EntityId,
        entity_type: &str,
        limit: usize,
    ) -> Result<Vec<EventRecord>, EventStoreError> {
        let key = StreamKey {
            entity_id,
            entity_type: entity_type.to_string(),
        };

        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::ReadFailed("lock poisoned".to_string()))?;

        // Streams are stored append-ordered, which is ascending timestamp
        // order by construction.
        Ok(streams
            .get(&key)
            .map(|stream| stream.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn get_by_id(&self, event_id: EventId) -> Result<Option<EventRecord>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::ReadFailed("lock poisoned".to_string()))?;

        Ok(streams
            .values()
            .flat_map(|stream| stream.iter())
            .find(|record| record.event_id == event_id)
            .cloned())
    }
}
