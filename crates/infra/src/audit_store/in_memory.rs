use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::info;

use entrylog_audit::{AuditError, AuditLogEntry, AuditRecord, AuditStore};
use entrylog_core::{AuditId, EntityId, UserId};

/// In-memory append-only audit log. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditStore for InMemoryAuditStore {
    fn log(&self, entry: AuditLogEntry) -> Result<AuditRecord, AuditError> {
        let record = AuditRecord {
            audit_id: AuditId::new(),
            timestamp: Utc::now(),
            entry,
        };

        let mut records = self
            .records
            .write()
            .map_err(|_| AuditError::WriteFailed("lock poisoned".to_string()))?;
        records.push(record.clone());

        info!(
            audit_id = %record.audit_id,
            action = %record.entry.action,
            actor = %record.entry.actor.username,
            success = record.entry.success,
            "audit log entry created"
        );

        Ok(record)
    }

    fn by_actor(&self, actor_id: UserId, limit: usize) -> Result<Vec<AuditRecord>, AuditError> {
        let records = self
            .records
            .read()
            .map_err(|_| AuditError::ReadFailed("lock poisoned".to_string()))?;

        Ok(records
            .iter()
            .rev()
            .filter(|r| r.entry.actor.id == actor_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn by_resource(
        &self,
        resource_type: &str,
        resource_id: EntityId,
        limit: usize,
    ) -> Result<Vec<AuditRecord>, AuditError> {
        let records = self
            .records
            .read()
            .map_err(|_| AuditError::ReadFailed("lock poisoned".to_string()))?;

        Ok(records
            .iter()
            .rev()
            .filter(|r| {
                r.entry.resource_type == resource_type && r.entry.resource_id == Some(resource_id)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    fn failures(&self, limit: usize) -> Result<Vec<AuditRecord>, AuditError> {
        let records = self
            .records
            .read()
            .map_err(|_| AuditError::ReadFailed("lock poisoned".to_string()))?;

        Ok(records
            .iter()
            .rev()
            .filter(|r| !r.entry.success)
            .take(limit)
            .cloned()
            .collect())
    }

    fn in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditRecord>, AuditError> {
        let records = self
            .records
            .read()
            .map_err(|_| AuditError::ReadFailed("lock poisoned".to_string()))?;

        Ok(records
            .iter()
            .filter(|r| r.timestamp >= from && r.timestamp <= to)
            .cloned()
            .collect())
    }
}
