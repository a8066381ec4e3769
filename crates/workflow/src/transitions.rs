//! The transition table.
//!
//! One row per legal `(from state, event type)` edge, carrying the target
//! state and the role required to take the edge. Any pair absent from the
//! table is an illegal transition. Admin satisfies every role requirement.

use crate::{EntryState, WorkflowError};

/// One legal lifecycle edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: EntryState,
    pub to: EntryState,
    pub event_type: &'static str,
    pub required_role: &'static str,
}

const fn edge(
    from: EntryState,
    event_type: &'static str,
    to: EntryState,
    required_role: &'static str,
) -> Transition {
    Transition {
        from,
        to,
        event_type,
        required_role,
    }
}

/// Every legal transition in the data-entry lifecycle.
pub const TRANSITIONS: [Transition; 9] = [
    edge(EntryState::Draft, "data.submitted", EntryState::Submitted, "operator"),
    edge(EntryState::Submitted, "data.confirmed", EntryState::Confirmed, "supervisor"),
    edge(EntryState::Submitted, "data.rejected", EntryState::Rejected, "supervisor"),
    edge(EntryState::Submitted, "data.cancelled", EntryState::Cancelled, "operator"),
    edge(EntryState::Confirmed, "data.corrected", EntryState::Corrected, "supervisor"),
    edge(EntryState::Rejected, "data.corrected", EntryState::Corrected, "supervisor"),
    edge(EntryState::Rejected, "data.cancelled", EntryState::Cancelled, "operator"),
    edge(EntryState::Corrected, "data.submitted", EntryState::Submitted, "supervisor"),
    edge(EntryState::Corrected, "data.confirmed", EntryState::Confirmed, "supervisor"),
];

/// Look up the edge for `(from, event_type)`, if one exists.
pub fn transition_for(from: EntryState, event_type: &str) -> Option<&'static Transition> {
    TRANSITIONS
        .iter()
        .find(|t| t.from == from && t.event_type == event_type)
}

/// Event types that may legally be applied from `from`.
pub fn allowed_events_from(from: EntryState) -> Vec<&'static str> {
    TRANSITIONS
        .iter()
        .filter(|t| t.from == from)
        .map(|t| t.event_type)
        .collect()
}

/// Validate an edge and the actor's role for it.
///
/// Legality is checked first, then the role requirement; `admin` passes
/// any role check. The outcome for every `(state, event, role)` triple is
/// fully determined by the table.
pub fn validate(
    from: EntryState,
    event_type: &str,
    actor_role: &str,
) -> Result<&'static Transition, WorkflowError> {
    let transition =
        transition_for(from, event_type).ok_or_else(|| WorkflowError::InvalidTransition {
            current: from,
            event_type: event_type.to_string(),
        })?;

    if actor_role != transition.required_role && actor_role != "admin" {
        return Err(WorkflowError::UnauthorizedRole {
            role: actor_role.to_string(),
            required: transition.required_role.to_string(),
        });
    }

    Ok(transition)
}
