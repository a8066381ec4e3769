//! `entrylog-events` — the immutable event model and the state folder.
//!
//! Events are facts: once appended they are never updated or deleted. The
//! current state of an entity is always derivable by folding its ordered
//! event history (`fold`); any cached view is a disposable optimization.

pub mod category;
pub mod event_type;
pub mod fold;
pub mod record;
pub mod write;

pub use category::{category_for, EventCategory};
pub use event_type::{EventType, EventTypeError};
pub use fold::{fold, CurrentState};
pub use record::EventRecord;
pub use write::{EventWriteRequest, EventWriteResult, RequestValidationError};
