//! Data-entry read model.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use entrylog_core::{Actor, EntityId};
use entrylog_events::EventRecord;
use entrylog_workflow::EntryState;

use crate::event_store::{EventStore, EventStoreError, FOLD_LIST_LIMIT};

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("no projection row for entity {0}")]
    MissingRow(EntityId),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

    #[error("unknown entry state in event payload: '{0}'")]
    UnknownState(String),

    #[error(transparent)]
    Store(#[from] EventStoreError),
}

/// One materialized data-entry row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataEntryRow {
    pub entry_id: EntityId,
    pub data: JsonValue,
    pub status: EntryState,

    pub created_by: Actor,
    pub created_at: DateTime<Utc>,

    pub submitted_at: Option<DateTime<Utc>>,

    pub confirmed_by: Option<Actor>,
    pub confirmed_at: Option<DateTime<Utc>>,

    pub rejected_by: Option<Actor>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,

    pub correction_count: u32,
    pub last_corrected_by: Option<Actor>,
    pub last_corrected_at: Option<DateTime<Utc>>,

    /// Number of events applied; mirrors the stream's event count.
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

/// Materialized view of data entries, rebuildable from the event stream.
///
/// Idempotent for at-least-once delivery: a per-entity cursor tracks the
/// last applied sequence number and replays at or below it are ignored.
#[derive(Debug, Default)]
pub struct DataEntryProjection {
    rows: RwLock<HashMap<EntityId, DataEntryRow>>,
    cursors: RwLock<HashMap<EntityId, u64>>,
}

impl DataEntryProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entry_id: EntityId) -> Option<DataEntryRow> {
        self.rows.read().ok()?.get(&entry_id).cloned()
    }

    pub fn list(&self) -> Vec<DataEntryRow> {
        self.rows
            .read()
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Apply one event.
    ///
    /// Duplicates (sequence at or below the cursor) are ignored; events for
    /// other entity types are not this projection's concern and are
    /// skipped.
    pub fn apply(&self, record: &EventRecord) -> Result<(), ProjectionError> {
        if record.entity_type != "data_entry" {
            return Ok(());
        }

        if let Ok(mut cursors) = self.cursors.write() {
            let last = *cursors.get(&record.entity_id).unwrap_or(&0);
            if record.sequence_number <= last {
                // Duplicate or replay; safe to ignore.
                return Ok(());
            }
            if last != 0 && record.sequence_number != last + 1 {
                return Err(ProjectionError::NonMonotonicSequence {
                    last,
                    found: record.sequence_number,
                });
            }
            cursors.insert(record.entity_id, record.sequence_number);
        }

        let mut rows = match self.rows.write() {
            Ok(rows) => rows,
            Err(_) => return Ok(()),
        };

        match record.event_type.as_str() {
            "data.created" => {
                rows.insert(record.entity_id, row_from_created(record));
                Ok(())
            }
            _ => {
                let row = rows
                    .get_mut(&record.entity_id)
                    .ok_or(ProjectionError::MissingRow(record.entity_id))?;
                apply_to_row(row, record)
            }
        }
    }

    /// Throw the cached row away and replay the entity's full stream.
    pub fn rebuild<S: EventStore>(
        &self,
        store: &S,
        entry_id: EntityId,
    ) -> Result<(), ProjectionError> {
        if let Ok(mut rows) = self.rows.write() {
            rows.remove(&entry_id);
        }
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.remove(&entry_id);
        }

        let records = store.list_for_entity(entry_id, "data_entry", FOLD_LIST_LIMIT)?;
        for record in &records {
            self.apply(record)?;
        }
        Ok(())
    }
}

fn row_from_created(record: &EventRecord) -> DataEntryRow {
    DataEntryRow {
        entry_id: record.entity_id,
        data: record.payload.get("data").cloned().unwrap_or(JsonValue::Null),
        status: state_of(record).unwrap_or(EntryState::Draft),
        created_by: record.actor.clone(),
        created_at: record.timestamp,
        submitted_at: None,
        confirmed_by: None,
        confirmed_at: None,
        rejected_by: None,
        rejected_at: None,
        rejection_reason: None,
        correction_count: 0,
        last_corrected_by: None,
        last_corrected_at: None,
        version: record.sequence_number,
        updated_at: record.timestamp,
    }
}

fn apply_to_row(row: &mut DataEntryRow, record: &EventRecord) -> Result<(), ProjectionError> {
    match record.event_type.as_str() {
        "data.submitted" => {
            row.status = EntryState::Submitted;
            row.submitted_at = Some(record.timestamp);
        }
        "data.confirmed" => {
            row.status = EntryState::Confirmed;
            row.confirmed_by = Some(record.actor.clone());
            row.confirmed_at = Some(record.timestamp);
        }
        "data.rejected" => {
            row.status = EntryState::Rejected;
            row.rejected_by = Some(record.actor.clone());
            row.rejected_at = Some(record.timestamp);
            row.rejection_reason = record
                .payload
                .get("rejection_reason")
                .and_then(JsonValue::as_str)
                .map(str::to_string);
        }
        "data.corrected" => {
            row.status = EntryState::Corrected;
            row.correction_count += 1;
            row.last_corrected_by = Some(record.actor.clone());
            row.last_corrected_at = Some(record.timestamp);
            if let Some(corrected) = record.payload.get("corrected_data") {
                row.data = corrected.clone();
            }
        }
        "data.cancelled" => {
            row.status = EntryState::Cancelled;
        }
        _ => {
            // System events (auto_validated, expired) and unknown types
            // don't change the row; still advance version/updated_at below.
            if let Some(raw) = record.payload.get("state").and_then(JsonValue::as_str) {
                row.status = raw
                    .parse()
                    .map_err(|_| ProjectionError::UnknownState(raw.to_string()))?;
            }
        }
    }

    row.version = record.sequence_number;
    row.updated_at = record.timestamp;
    Ok(())
}

fn state_of(record: &EventRecord) -> Option<EntryState> {
    record
        .payload
        .get("state")
        .and_then(JsonValue::as_str)
        .and_then(|raw| raw.parse().ok())
}
