//! Event type identifiers, format `"prefix.action"`.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Event type format violation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventTypeError {
    #[error("event_type cannot be empty")]
    Empty,

    #[error("invalid event_type format: '{0}'. Expected 'prefix.action'")]
    Malformed(String),
}

/// A validated event type such as `data.confirmed`.
///
/// The format is exactly two non-empty dot-separated segments: the entity
/// prefix and the action. Validation happens at parse time; a constructed
/// `EventType` is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EventType(String);

impl EventType {
    pub fn parse(raw: impl Into<String>) -> Result<Self, EventTypeError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(EventTypeError::Empty);
        }

        let mut segments = raw.split('.');
        match (segments.next(), segments.next(), segments.next()) {
            (Some(prefix), Some(action), None) if !prefix.is_empty() && !action.is_empty() => {
                Ok(Self(raw))
            }
            _ => Err(EventTypeError::Malformed(raw)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The entity prefix, e.g. `data` for `data.confirmed`.
    pub fn prefix(&self) -> &str {
        self.0.split('.').next().unwrap_or_default()
    }

    /// The action segment, e.g. `confirmed` for `data.confirmed`.
    pub fn action(&self) -> &str {
        self.0.split('.').nth(1).unwrap_or_default()
    }
}

impl core::fmt::Display for EventType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EventType {
    type Err = EventTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// Deserialization re-validates so malformed types cannot enter through
// stored data either.
impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        EventType::parse(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_two_segment_types() {
        let et = EventType::parse("data.confirmed").unwrap();
        assert_eq!(et.prefix(), "data");
        assert_eq!(et.action(), "confirmed");
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(EventType::parse("").unwrap_err(), EventTypeError::Empty);
    }

    #[test]
    fn rejects_wrong_segment_count() {
        for raw in ["data", "data.confirmed.extra", "data..", ".confirmed", "data."] {
            assert!(
                matches!(EventType::parse(raw), Err(EventTypeError::Malformed(_))),
                "expected '{raw}' to be rejected"
            );
        }
    }

    #[test]
    fn deserialize_revalidates() {
        let ok: Result<EventType, _> = serde_json::from_str("\"data.created\"");
        assert!(ok.is_ok());

        let bad: Result<EventType, _> = serde_json::from_str("\"nodot\"");
        assert!(bad.is_err());
    }
}
