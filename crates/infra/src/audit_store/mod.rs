//! Audit store implementations.
//!
//! The boundary trait lives in `entrylog-audit`; this module provides the
//! in-memory (tests/dev) and Postgres-backed stores.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryAuditStore;
pub use postgres::PostgresAuditStore;
