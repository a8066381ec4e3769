//! Append-only event store boundary.
//!
//! Defines the storage-agnostic contract for durable, ordered, immutable
//! event streams, plus the in-memory (tests/dev) and Postgres (durable)
//! implementations.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use r#trait::{EventStore, EventStoreError, FOLD_LIST_LIMIT};
