//! Append-only audit store boundary.

use chrono::{DateTime, Utc};
use thiserror::Error;

use entrylog_core::{EntityId, UserId};

use crate::{AuditLogEntry, AuditRecord};

/// Audit store failure.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The underlying store rejected the write. Never swallowed: the
    /// caller decides whether a lost audit record is fatal to the
    /// triggering request.
    #[error("audit write failed: {0}")]
    WriteFailed(String),

    #[error("audit read failed: {0}")]
    ReadFailed(String),
}

/// Append-only audit log.
///
/// `log` is the only write path; there is no update or delete. The read
/// helpers are plain filtered scans and impose no extra invariants.
pub trait AuditStore: Send + Sync {
    /// Append one entry; returns the stored record with id and timestamp.
    fn log(&self, entry: AuditLogEntry) -> Result<AuditRecord, AuditError>;

    /// Entries by one actor, most recent first.
    fn by_actor(&self, actor_id: UserId, limit: usize) -> Result<Vec<AuditRecord>, AuditError>;

    /// Entries touching one resource, most recent first.
    fn by_resource(
        &self,
        resource_type: &str,
        resource_id: EntityId,
        limit: usize,
    ) -> Result<Vec<AuditRecord>, AuditError>;

    /// Failed actions only, most recent first.
    fn failures(&self, limit: usize) -> Result<Vec<AuditRecord>, AuditError>;

    /// Entries within `[from, to]`, oldest first.
    fn in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditRecord>, AuditError>;
}

impl<S> AuditStore for std::sync::Arc<S>
where
    S: AuditStore + ?Sized,
{
    fn log(&self, entry: AuditLogEntry) -> Result<AuditRecord, AuditError> {
        (**self).log(entry)
    }

    fn by_actor(&self, actor_id: UserId, limit: usize) -> Result<Vec<AuditRecord>, AuditError> {
        (**self).by_actor(actor_id, limit)
    }

    fn by_resource(
        &self,
        resource_type: &str,
        resource_id: EntityId,
        limit: usize,
    ) -> Result<Vec<AuditRecord>, AuditError> {
        (**self).by_resource(resource_type, resource_id, limit)
    }

    fn failures(&self, limit: usize) -> Result<Vec<AuditRecord>, AuditError> {
        (**self).failures(limit)
    }

    fn in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditRecord>, AuditError> {
        (**self).in_range(from, to)
    }
}
