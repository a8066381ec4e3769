//! `entrylog-workflow` — the data-entry lifecycle state machine.
//!
//! Pure layer: states, the transition table, and validation of
//! `(current state, event type, actor role)` triples. "Is this edge legal"
//! and "may this role take it" are both table lookups, so review and
//! testing are exhaustive over a finite edge set. The fold+append
//! orchestration lives in `entrylog-infra`.

pub mod error;
pub mod state;
pub mod transitions;

pub use error::WorkflowError;
pub use state::{EntryState, UnknownStateError};
pub use transitions::{allowed_events_from, transition_for, validate, Transition, TRANSITIONS};
