//! The state folder: `state = fold(events)`.

use chrono::{DateTime, Utc};
use serde_json::Value;

use entrylog_core::{merge_into, Payload};

use crate::EventRecord;

/// Derived current state of one entity.
///
/// Never stored as ground truth: always reproducible by replaying the
/// entity's events from scratch. Cached projections must match this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentState {
    /// Last-writer-wins merge of all event payloads, in timestamp order.
    pub payload: Payload,
    pub event_count: usize,
    pub last_event_at: Option<DateTime<Utc>>,
}

impl CurrentState {
    /// The lifecycle state string, from the last event that wrote a
    /// `state` key.
    pub fn state_str(&self) -> Option<&str> {
        self.payload.get("state").and_then(Value::as_str)
    }

    /// The business data object, if any event wrote a `data` key.
    pub fn data(&self) -> Option<&Value> {
        self.payload.get("data")
    }

    pub fn is_empty(&self) -> bool {
        self.event_count == 0
    }
}

/// Fold an entity's events into its current state.
///
/// Events are replayed in ascending `(timestamp, sequence_number)` order;
/// later events override earlier keys with the same name. Deterministic:
/// the same sequence always folds to the same state.
pub fn fold(records: &[EventRecord]) -> CurrentState {
    let mut ordered: Vec<&EventRecord> = records.iter().collect();
    ordered.sort_by_key(|r| (r.timestamp, r.sequence_number));

    let mut payload = Payload::new();
    let mut last_event_at = None;

    for record in &ordered {
        merge_into(&mut payload, &record.payload);
        last_event_at = Some(record.timestamp);
    }

    CurrentState {
        payload,
        event_count: ordered.len(),
        last_event_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use entrylog_core::{Actor, EntityId, EventId, UserId};
    use proptest::prelude::*;
    use serde_json::json;

    use crate::{category_for, EventType};

    fn record(seq: u64, minute: u32, pairs: &[(&str, Value)]) -> EventRecord {
        let event_type = EventType::parse("data.created").unwrap();
        EventRecord {
            event_id: EventId::new(),
            event_version: 1,
            entity_id: EntityId::from_uuid(uuid::Uuid::from_u128(1)),
            entity_type: "data_entry".to_string(),
            event_category: category_for(&event_type),
            event_type,
            sequence_number: seq,
            payload: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            previous_payload: None,
            actor: Actor::new(UserId::new(), "operator", "op1"),
            correlation_id: None,
            causation_id: None,
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 10, minute, 0).unwrap(),
            context: None,
        }
    }

    #[test]
    fn empty_stream_folds_to_empty_state() {
        let state = fold(&[]);
        assert!(state.is_empty());
        assert_eq!(state.state_str(), None);
        assert_eq!(state.last_event_at, None);
    }

    #[test]
    fn last_state_key_wins() {
        let records = vec![
            record(1, 0, &[("state", json!("draft")), ("data", json!({"x": 1}))]),
            record(2, 1, &[("state", json!("submitted"))]),
            record(3, 2, &[("state", json!("confirmed"))]),
        ];

        let state = fold(&records);
        assert_eq!(state.state_str(), Some("confirmed"));
        assert_eq!(state.data(), Some(&json!({"x": 1})));
        assert_eq!(state.event_count, 3);
        assert_eq!(state.last_event_at, Some(records[2].timestamp));
    }

    #[test]
    fn fold_orders_by_timestamp_not_input_order() {
        let newest = record(2, 5, &[("state", json!("submitted"))]);
        let oldest = record(1, 0, &[("state", json!("draft"))]);

        // Reverse input order must not matter.
        let state = fold(&[newest, oldest]);
        assert_eq!(state.state_str(), Some("submitted"));
    }

    #[test]
    fn equal_timestamps_fall_back_to_sequence_order() {
        let first = record(1, 0, &[("state", json!("draft"))]);
        let second = record(2, 0, &[("state", json!("submitted"))]);

        let state = fold(&[second.clone(), first.clone()]);
        assert_eq!(state.state_str(), Some("submitted"));
    }

    proptest! {
        #[test]
        fn fold_is_deterministic(
            values in proptest::collection::vec(
                proptest::collection::btree_map("[a-d]", 0i64..100, 0..4),
                0..8,
            )
        ) {
            let records: Vec<EventRecord> = values
                .iter()
                .enumerate()
                .map(|(i, pairs)| {
                    let mapped: Vec<(&str, Value)> = pairs
                        .iter()
                        .map(|(k, v)| (k.as_str(), json!(v)))
                        .collect();
                    record((i + 1) as u64, i as u32, &mapped)
                })
                .collect();

            let a = fold(&records);
            let b = fold(&records);
            prop_assert_eq!(&a.payload, &b.payload);
            prop_assert_eq!(a.event_count, b.event_count);
            prop_assert_eq!(a.last_event_at, b.last_event_at);
        }
    }
}
