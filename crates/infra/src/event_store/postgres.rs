//! Postgres-backed event store.
//!
//! Persists events to an append-only `events` table with the optimistic
//! concurrency check and the insert in one transaction. A unique index on
//! `(entity_id, entity_type, sequence_number)` backstops the version check:
//! two racing appends cannot both commit the same successor.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE events (
//!     event_id        UUID PRIMARY KEY,
//!     event_version   BIGINT      NOT NULL,
//!     entity_id       UUID        NOT NULL,
//!     entity_type     TEXT        NOT NULL,
//!     event_type      TEXT        NOT NULL,
//!     event_category  TEXT        NOT NULL,
//!     sequence_number BIGINT      NOT NULL,
//!     payload         JSONB       NOT NULL,
//!     previous_payload JSONB,
//!     actor_id        UUID        NOT NULL,
//!     actor_role      TEXT        NOT NULL,
//!     actor_username  TEXT        NOT NULL,
//!     correlation_id  UUID,
//!     causation_id    UUID,
//!     timestamp       TIMESTAMPTZ NOT NULL,
//!     context         JSONB,
//!     UNIQUE (entity_id, entity_type, sequence_number)
//! );
//! CREATE INDEX idx_events_entity ON events (entity_id, entity_type, timestamp);
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use entrylog_core::{Actor, EntityId, EventId, ExpectedVersion, Payload};
use entrylog_events::{category_for, EventRecord, EventType, EventWriteRequest};

use super::r#trait::{EventStore, EventStoreError};

/// Postgres-backed append-only event store.
///
/// The [`EventStore`] trait is synchronous; database calls run on the
/// ambient tokio runtime via `Handle::block_on`, the same bridge the rest
/// of this workspace's callers use.
#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: Arc<PgPool>,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(skip(self, request), fields(entity_id = %request.entity_id, event_type = %request.event_type), err)]
    pub async fn append_event(
        &self,
        request: EventWriteRequest,
        expected_version: ExpectedVersion,
    ) -> Result<EventRecord, EventStoreError> {
        request.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("append.begin", e))?;

        let head = sqlx::query(
            r#"
            SELECT COALESCE(MAX(sequence_number), 0) AS version, MAX(timestamp) AS last_timestamp
            FROM events
            WHERE entity_id = $1 AND entity_type = $2
            "#,
        )
        .bind(request.entity_id.as_uuid())
        .bind(&request.entity_type)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("append.head", e))?;

        let current: i64 = head
            .try_get("version")
            .map_err(|_| EventStoreError::ReadFailed("append.head: failed to decode stream head".to_string()))?;
        let last_timestamp: Option<DateTime<Utc>> = head
            .try_get("last_timestamp")
            .map_err(|_| EventStoreError::ReadFailed("append.head: failed to decode stream head".to_string()))?;

        if !expected_version.matches(current as u64) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        // Per-stream timestamps never go backwards.
        let mut timestamp = Utc::now();
        if let Some(last) = last_timestamp {
            if timestamp < last {
                timestamp = last;
            }
        }

        let record = EventRecord {
            event_id: EventId::new(),
            event_version: 1,
            entity_id: request.entity_id,
            entity_type: request.entity_type,
            event_category: category_for(&request.event_type),
            event_type: request.event_type,
            sequence_number: (current + 1) as u64,
            payload: request.payload,
            previous_payload: request.previous_payload,
            actor: request.actor,
            correlation_id: request.correlation_id,
            causation_id: request.causation_id,
            timestamp,
            context: request.context,
        };

        sqlx::query(
            r#"
            INSERT INTO events (
                event_id, event_version, entity_id, entity_type,
                event_type, event_category, sequence_number,
                payload, previous_payload,
                actor_id, actor_role, actor_username,
                correlation_id, causation_id, timestamp, context
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(record.event_id.as_uuid())
        .bind(record.event_version as i64)
        .bind(record.entity_id.as_uuid())
        .bind(&record.entity_type)
        .bind(record.event_type.as_str())
        .bind(record.event_category.as_str())
        .bind(record.sequence_number as i64)
        .bind(JsonValue::Object(record.payload.clone()))
        .bind(record.previous_payload.clone().map(JsonValue::Object))
        .bind(record.actor.id.as_uuid())
        .bind(&record.actor.role)
        .bind(&record.actor.username)
        .bind(record.correlation_id.map(|id| *id.as_uuid()))
        .bind(record.causation_id.map(|id| *id.as_uuid()))
        .bind(record.timestamp)
        .bind(record.context.clone().map(JsonValue::Object))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("append.insert", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("append.commit", e))?;

        Ok(record)
    }

    #[instrument(skip(self), fields(entity_id = %entity_id), err)]
    pub async fn list_events(
        &self,
        entity_id: EntityId,
        entity_type: &str,
        limit: usize,
    ) -> Result<Vec<EventRecord>, EventStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                event_id, event_version, entity_id, entity_type,
                event_type, event_category, sequence_number,
                payload, previous_payload,
                actor_id, actor_role, actor_username,
                correlation_id, causation_id, timestamp, context
            FROM events
            WHERE entity_id = $1 AND entity_type = $2
            ORDER BY timestamp ASC, sequence_number ASC
            LIMIT $3
            "#,
        )
        .bind(entity_id.as_uuid())
        .bind(entity_type)
        .bind(limit as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_for_entity", e))?;

        rows.iter().map(decode_row).collect()
    }

    #[instrument(skip(self), fields(event_id = %event_id), err)]
    pub async fn get_event(
        &self,
        event_id: EventId,
    ) -> Result<Option<EventRecord>, EventStoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                event_id, event_version, entity_id, entity_type,
                event_type, event_category, sequence_number,
                payload, previous_payload,
                actor_id, actor_role, actor_username,
                correlation_id, causation_id, timestamp, context
            FROM events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_by_id", e))?;

        row.as_ref().map(decode_row).transpose()
    }

    fn runtime_handle() -> Result<tokio::runtime::Handle, EventStoreError> {
        tokio::runtime::Handle::try_current().map_err(|_| {
            EventStoreError::WriteFailed(
                "PostgresEventStore requires a tokio runtime context".to_string(),
            )
        })
    }
}

impl EventStore for PostgresEventStore {
    fn append(
        &self,
        request: EventWriteRequest,
        expected_version: ExpectedVersion,
    ) -> Result<EventRecord, EventStoreError> {
        Self::runtime_handle()?.block_on(self.append_event(request, expected_version))
    }

    fn list_for_entity(
        &self,
        entity_id: EntityId,
        entity_type: &str,
        limit: usize,
    ) -> Result<Vec<EventRecord>, EventStoreError> {
        Self::runtime_handle()?.block_on(self.list_events(entity_id, entity_type, limit))
    }

    fn get_by_id(&self, event_id: EventId) -> Result<Option<EventRecord>, EventStoreError> {
        Self::runtime_handle()?.block_on(self.get_event(event_id))
    }
}

fn decode_row(row: &sqlx::postgres::PgRow) -> Result<EventRecord, EventStoreError> {
    let read = |what: &str, _e: sqlx::Error| {
        EventStoreError::ReadFailed(format!("failed to decode column '{what}'"))
    };

    let event_type_raw: String = row.try_get("event_type").map_err(|e| read("event_type", e))?;
    let event_type = EventType::parse(event_type_raw)
        .map_err(|e| EventStoreError::ReadFailed(format!("stored event_type: {e}")))?;

    let payload = decode_object(row.try_get("payload").map_err(|e| read("payload", e))?)?;
    let previous_payload = row
        .try_get::<Option<JsonValue>, _>("previous_payload")
        .map_err(|e| read("previous_payload", e))?
        .map(decode_object)
        .transpose()?;
    let context = row
        .try_get::<Option<JsonValue>, _>("context")
        .map_err(|e| read("context", e))?
        .map(decode_object)
        .transpose()?;

    Ok(EventRecord {
        event_id: EventId::from_uuid(row.try_get("event_id").map_err(|e| read("event_id", e))?),
        event_version: row.try_get::<i64, _>("event_version").map_err(|e| read("event_version", e))?
            as u32,
        entity_id: EntityId::from_uuid(row.try_get("entity_id").map_err(|e| read("entity_id", e))?),
        entity_type: row.try_get("entity_type").map_err(|e| read("entity_type", e))?,
        event_category: category_for(&event_type),
        event_type,
        sequence_number: row
            .try_get::<i64, _>("sequence_number")
            .map_err(|e| read("sequence_number", e))? as u64,
        payload,
        previous_payload,
        actor: Actor::new(
            row.try_get::<Uuid, _>("actor_id").map_err(|e| read("actor_id", e))?.into(),
            row.try_get::<String, _>("actor_role").map_err(|e| read("actor_role", e))?,
            row.try_get::<String, _>("actor_username").map_err(|e| read("actor_username", e))?,
        ),
        correlation_id: row
            .try_get::<Option<Uuid>, _>("correlation_id")
            .map_err(|e| read("correlation_id", e))?
            .map(Into::into),
        causation_id: row
            .try_get::<Option<Uuid>, _>("causation_id")
            .map_err(|e| read("causation_id", e))?
            .map(EventId::from_uuid),
        timestamp: row.try_get("timestamp").map_err(|e| read("timestamp", e))?,
        context,
    })
}

fn decode_object(value: JsonValue) -> Result<Payload, EventStoreError> {
    match value {
        JsonValue::Object(map) => Ok(map),
        other => Err(EventStoreError::ReadFailed(format!(
            "expected JSON object payload, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Map sqlx errors onto the store taxonomy without leaking driver detail
/// beyond a stable operation name.
fn map_sqlx_error(operation: &str, error: sqlx::Error) -> EventStoreError {
    match &error {
        sqlx::Error::Database(db) => {
            // 23505: unique violation on (entity, type, sequence); a
            // concurrent append won the race.
            if db.code().as_deref() == Some("23505") {
                return EventStoreError::Concurrency(format!(
                    "concurrent append detected during {operation}"
                ));
            }
            EventStoreError::WriteFailed(format!("{operation}: database error"))
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            EventStoreError::WriteFailed(format!("{operation}: storage unavailable"))
        }
        _ => EventStoreError::WriteFailed(format!("{operation}: storage error")),
    }
}
