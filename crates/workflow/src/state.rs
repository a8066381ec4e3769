//! Data entry lifecycle states.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// States a data entry moves through.
///
/// `Cancelled` is terminal: no outgoing edges exist in the transition
/// table. Everything else has at least one successor.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    Draft,
    Submitted,
    Confirmed,
    Rejected,
    Corrected,
    Cancelled,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown entry state: '{0}'")]
pub struct UnknownStateError(pub String);

impl EntryState {
    pub const ALL: [EntryState; 6] = [
        EntryState::Draft,
        EntryState::Submitted,
        EntryState::Confirmed,
        EntryState::Rejected,
        EntryState::Corrected,
        EntryState::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryState::Draft => "draft",
            EntryState::Submitted => "submitted",
            EntryState::Confirmed => "confirmed",
            EntryState::Rejected => "rejected",
            EntryState::Corrected => "corrected",
            EntryState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryState::Cancelled)
    }
}

impl core::fmt::Display for EntryState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryState {
    type Err = UnknownStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(EntryState::Draft),
            "submitted" => Ok(EntryState::Submitted),
            "confirmed" => Ok(EntryState::Confirmed),
            "rejected" => Ok(EntryState::Rejected),
            "corrected" => Ok(EntryState::Corrected),
            "cancelled" => Ok(EntryState::Cancelled),
            other => Err(UnknownStateError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for state in EntryState::ALL {
            assert_eq!(state.as_str().parse::<EntryState>().unwrap(), state);
        }
    }

    #[test]
    fn serde_uses_lowercase_strings() {
        assert_eq!(
            serde_json::to_value(EntryState::Draft).unwrap(),
            serde_json::json!("draft")
        );
        let parsed: EntryState = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, EntryState::Cancelled);
    }

    #[test]
    fn only_cancelled_is_terminal() {
        for state in EntryState::ALL {
            assert_eq!(state.is_terminal(), state == EntryState::Cancelled);
        }
    }

    #[test]
    fn unknown_state_is_an_error() {
        assert!("pending".parse::<EntryState>().is_err());
    }
}
