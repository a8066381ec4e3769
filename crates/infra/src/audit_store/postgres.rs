//! Postgres-backed audit store.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE audit_logs (
//!     audit_id       UUID PRIMARY KEY,
//!     actor_id       UUID        NOT NULL,
//!     actor_role     TEXT        NOT NULL,
//!     actor_username TEXT        NOT NULL,
//!     action         TEXT        NOT NULL,
//!     resource_type  TEXT        NOT NULL,
//!     resource_id    UUID,
//!     scope_granted  TEXT,
//!     request_id     UUID,
//!     request_path   TEXT,
//!     request_method TEXT,
//!     user_agent     TEXT,
//!     ip_address     TEXT,
//!     success        BOOLEAN     NOT NULL,
//!     error_message  TEXT,
//!     status_code    INTEGER,
//!     timestamp      TIMESTAMPTZ NOT NULL,
//!     context        JSONB
//! );
//! CREATE INDEX idx_audit_resource ON audit_logs (resource_type, resource_id);
//! CREATE INDEX idx_audit_timestamp ON audit_logs (timestamp);
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use entrylog_audit::{AuditContext, AuditError, AuditLogEntry, AuditRecord, AuditStore};
use entrylog_core::{Actor, AuditId, EntityId, UserId};

/// Postgres-backed append-only audit log.
#[derive(Debug, Clone)]
pub struct PostgresAuditStore {
    pool: Arc<PgPool>,
}

impl PostgresAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(skip(self, entry), fields(action = %entry.action, actor = %entry.actor.username), err)]
    pub async fn insert(&self, entry: AuditLogEntry) -> Result<AuditRecord, AuditError> {
        let record = AuditRecord {
            audit_id: AuditId::new(),
            timestamp: Utc::now(),
            entry,
        };

        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                audit_id, actor_id, actor_role, actor_username,
                action, resource_type, resource_id, scope_granted,
                request_id, request_path, request_method, user_agent, ip_address,
                success, error_message, status_code, timestamp, context
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(record.audit_id.as_uuid())
        .bind(record.entry.actor.id.as_uuid())
        .bind(&record.entry.actor.role)
        .bind(&record.entry.actor.username)
        .bind(&record.entry.action)
        .bind(&record.entry.resource_type)
        .bind(record.entry.resource_id.map(|id| *id.as_uuid()))
        .bind(record.entry.scope_granted.as_deref())
        .bind(record.entry.request.request_id.map(|id| *id.as_uuid()))
        .bind(record.entry.request.request_path.as_deref())
        .bind(record.entry.request.request_method.as_deref())
        .bind(record.entry.request.user_agent.as_deref())
        .bind(record.entry.request.ip_address.as_deref())
        .bind(record.entry.success)
        .bind(record.entry.error_message.as_deref())
        .bind(record.entry.status_code.map(i32::from))
        .bind(record.timestamp)
        .bind(record.entry.context.clone().map(JsonValue::Object))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_write_error("log", e))?;

        Ok(record)
    }

    async fn fetch(
        &self,
        operation: &str,
        query: sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<Vec<AuditRecord>, AuditError> {
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|_| AuditError::ReadFailed(format!("{operation}: storage error")))?;

        rows.iter().map(decode_row).collect()
    }

    fn runtime_handle() -> Result<tokio::runtime::Handle, AuditError> {
        tokio::runtime::Handle::try_current().map_err(|_| {
            AuditError::WriteFailed("PostgresAuditStore requires a tokio runtime context".to_string())
        })
    }
}

impl AuditStore for PostgresAuditStore {
    fn log(&self, entry: AuditLogEntry) -> Result<AuditRecord, AuditError> {
        Self::runtime_handle()?.block_on(self.insert(entry))
    }

    fn by_actor(&self, actor_id: UserId, limit: usize) -> Result<Vec<AuditRecord>, AuditError> {
        let query = sqlx::query(
            r#"
            SELECT audit_id, actor_id, actor_role, actor_username,
                   action, resource_type, resource_id, scope_granted,
                   request_id, request_path, request_method, user_agent, ip_address,
                   success, error_message, status_code, timestamp, context
            FROM audit_logs
            WHERE actor_id = $1
            ORDER BY timestamp DESC
            LIMIT $2
            "#,
        )
        .bind(*actor_id.as_uuid())
        .bind(limit as i64);

        Self::runtime_handle()?.block_on(self.fetch("by_actor", query))
    }

    fn by_resource(
        &self,
        resource_type: &str,
        resource_id: EntityId,
        limit: usize,
    ) -> Result<Vec<AuditRecord>, AuditError> {
        let query = sqlx::query(
            r#"
            SELECT audit_id, actor_id, actor_role, actor_username,
                   action, resource_type, resource_id, scope_granted,
                   request_id, request_path, request_method, user_agent, ip_address,
                   success, error_message, status_code, timestamp, context
            FROM audit_logs
            WHERE resource_type = $1 AND resource_id = $2
            ORDER BY timestamp DESC
            LIMIT $3
            "#,
        )
        .bind(resource_type.to_string())
        .bind(*resource_id.as_uuid())
        .bind(limit as i64);

        Self::runtime_handle()?.block_on(self.fetch("by_resource", query))
    }

    fn failures(&self, limit: usize) -> Result<Vec<AuditRecord>, AuditError> {
        let query = sqlx::query(
            r#"
            SELECT audit_id, actor_id, actor_role, actor_username,
                   action, resource_type, resource_id, scope_granted,
                   request_id, request_path, request_method, user_agent, ip_address,
                   success, error_message, status_code, timestamp, context
            FROM audit_logs
            WHERE success = FALSE
            ORDER BY timestamp DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64);

        Self::runtime_handle()?.block_on(self.fetch("failures", query))
    }

    fn in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditRecord>, AuditError> {
        let query = sqlx::query(
            r#"
            SELECT audit_id, actor_id, actor_role, actor_username,
                   action, resource_type, resource_id, scope_granted,
                   request_id, request_path, request_method, user_agent, ip_address,
                   success, error_message, status_code, timestamp, context
            FROM audit_logs
            WHERE timestamp >= $1 AND timestamp <= $2
            ORDER BY timestamp ASC
            "#,
        )
        .bind(from)
        .bind(to);

        Self::runtime_handle()?.block_on(self.fetch("in_range", query))
    }
}

fn decode_row(row: &sqlx::postgres::PgRow) -> Result<AuditRecord, AuditError> {
    let read = |what: &str, _e: sqlx::Error| {
        AuditError::ReadFailed(format!("failed to decode column '{what}'"))
    };

    let context = row
        .try_get::<Option<JsonValue>, _>("context")
        .map_err(|e| read("context", e))?
        .map(|value| match value {
            JsonValue::Object(map) => Ok(map),
            _ => Err(AuditError::ReadFailed("expected JSON object context".to_string())),
        })
        .transpose()?;

    Ok(AuditRecord {
        audit_id: AuditId::from_uuid(row.try_get("audit_id").map_err(|e| read("audit_id", e))?),
        timestamp: row.try_get("timestamp").map_err(|e| read("timestamp", e))?,
        entry: AuditLogEntry {
            actor: Actor::new(
                row.try_get::<Uuid, _>("actor_id").map_err(|e| read("actor_id", e))?.into(),
                row.try_get::<String, _>("actor_role").map_err(|e| read("actor_role", e))?,
                row.try_get::<String, _>("actor_username")
                    .map_err(|e| read("actor_username", e))?,
            ),
            action: row.try_get("action").map_err(|e| read("action", e))?,
            resource_type: row.try_get("resource_type").map_err(|e| read("resource_type", e))?,
            resource_id: row
                .try_get::<Option<Uuid>, _>("resource_id")
                .map_err(|e| read("resource_id", e))?
                .map(EntityId::from_uuid),
            scope_granted: row.try_get("scope_granted").map_err(|e| read("scope_granted", e))?,
            request: AuditContext {
                request_id: row
                    .try_get::<Option<Uuid>, _>("request_id")
                    .map_err(|e| read("request_id", e))?
                    .map(Into::into),
                request_path: row.try_get("request_path").map_err(|e| read("request_path", e))?,
                request_method: row
                    .try_get("request_method")
                    .map_err(|e| read("request_method", e))?,
                user_agent: row.try_get("user_agent").map_err(|e| read("user_agent", e))?,
                ip_address: row.try_get("ip_address").map_err(|e| read("ip_address", e))?,
            },
            success: row.try_get("success").map_err(|e| read("success", e))?,
            error_message: row.try_get("error_message").map_err(|e| read("error_message", e))?,
            status_code: row
                .try_get::<Option<i32>, _>("status_code")
                .map_err(|e| read("status_code", e))?
                .map(|code| code as u16),
            context,
        },
    })
}

fn map_write_error(operation: &str, error: sqlx::Error) -> AuditError {
    match &error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            AuditError::WriteFailed(format!("{operation}: storage unavailable"))
        }
        _ => AuditError::WriteFailed(format!("{operation}: storage error")),
    }
}
