//! The persisted event shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use entrylog_core::{Actor, CorrelationId, EntityId, EventId, Payload};

use crate::{EventCategory, EventType};

/// One immutable, stored event.
///
/// A record is assigned its `event_id`, `sequence_number` and `timestamp` by
/// the store at append time. After that, no field ever changes; there is no
/// update or delete path anywhere in this workspace.
///
/// `sequence_number` is strictly increasing per `(entity_id, entity_type)`
/// stream and backs the optimistic concurrency guard. `timestamp` is
/// non-decreasing within a stream (no guarantee across streams).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: EventId,
    /// Schema version of the event shape itself.
    pub event_version: u32,

    pub entity_id: EntityId,
    pub entity_type: String,

    pub event_type: EventType,
    pub event_category: EventCategory,

    /// Position in the entity's stream, starting at 1.
    pub sequence_number: u64,

    pub payload: Payload,
    /// Populated only for correction events: the full folded payload as it
    /// stood immediately before the correction.
    pub previous_payload: Option<Payload>,

    pub actor: Actor,

    pub correlation_id: Option<CorrelationId>,
    pub causation_id: Option<EventId>,

    pub timestamp: DateTime<Utc>,
    pub context: Option<Payload>,
}
