//! Read-model projections.
//!
//! Projections are disposable caches built from the event stream. The fold
//! over `events` stays authoritative, and every projection can be rebuilt
//! from scratch by replaying history.

pub mod data_entries;

pub use data_entries::{DataEntryProjection, DataEntryRow, ProjectionError};
