//! Event store backends for the Sluice relay retention layer.
//!
//! The retention core consumes storage through the narrow [`EventStore`]
//! capability trait. This crate provides the trait and three
//! implementations, one of which is chosen at startup:
//!
//! ```text
//! StoreBackend (BackendKind from config)
//!     |
//!     +-- PostgresEventStore  (PostgresPool, migrations/)
//!     +-- SqliteEventStore    (SqlitePool, migrations_sqlite/)
//!     +-- MemoryEventStore    (RwLock<BTreeMap>)
//! ```
//!
//! # Modules
//!
//! - [`store`] -- The [`EventStore`] trait and [`SaveOutcome`]
//! - [`postgres`] -- `PostgreSQL` connection pool and store
//! - [`sqlite`] -- `SQLite` store
//! - [`memory`] -- In-memory store
//! - [`backend`] -- [`StoreBackend`] and [`BackendKind`]
//! - [`row`] -- Row mapping shared by the SQL backends
//! - [`error`] -- Shared error types

pub mod backend;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod row;
pub mod sqlite;
pub mod store;

// Re-export primary types for convenience.
pub use backend::{BackendKind, StoreBackend};
pub use error::DbError;
pub use memory::MemoryEventStore;
pub use postgres::{PostgresConfig, PostgresEventStore, PostgresPool};
pub use row::EventRow;
pub use sqlite::{SqliteConfig, SqliteEventStore};
pub use store::{EventStore, SaveOutcome};
