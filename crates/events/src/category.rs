//! Event classification: who (or what) produced the change.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::EventType;

/// Category of an event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    /// A user-initiated change.
    User,
    /// Produced by the system itself (validation sweeps, expiry).
    System,
    /// A non-destructive amendment that snapshots the prior payload.
    Correction,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::User => "user",
            EventCategory::System => "system",
            EventCategory::Correction => "correction",
        }
    }
}

/// Classify a known event type.
///
/// Unknown types are treated as `User` with a warning rather than rejected:
/// the format check already guards the shape, and the writer should not
/// break when a new event type ships before this table learns about it.
pub fn category_for(event_type: &EventType) -> EventCategory {
    match event_type.as_str() {
        "data.created" | "data.submitted" | "data.confirmed" | "data.rejected"
        | "data.cancelled" => EventCategory::User,
        "data.corrected" => EventCategory::Correction,
        "data.auto_validated" | "data.expired" => EventCategory::System,
        "user.created" | "user.role_changed" | "user.deactivated" => EventCategory::User,
        other => {
            warn!(event_type = other, "unknown event type; defaulting category to 'user'");
            EventCategory::User
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn et(raw: &str) -> EventType {
        EventType::parse(raw).unwrap()
    }

    #[test]
    fn lifecycle_events_are_user_category() {
        for raw in ["data.created", "data.submitted", "data.confirmed", "data.cancelled"] {
            assert_eq!(category_for(&et(raw)), EventCategory::User);
        }
    }

    #[test]
    fn corrections_are_their_own_category() {
        assert_eq!(category_for(&et("data.corrected")), EventCategory::Correction);
    }

    #[test]
    fn system_generated_events() {
        assert_eq!(category_for(&et("data.auto_validated")), EventCategory::System);
        assert_eq!(category_for(&et("data.expired")), EventCategory::System);
    }

    #[test]
    fn unknown_types_default_to_user() {
        assert_eq!(category_for(&et("widget.frobbed")), EventCategory::User);
    }
}
