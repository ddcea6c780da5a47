//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`]. To the retention core every
//! variant means the same thing: the store is unavailable for the
//! operation that was attempted.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A SQL backend (`PostgreSQL` or `SQLite`) operation failed.
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    /// A schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// An event could not be encoded for storage.
    #[error("serialization error: {0}")]
    Serialization(#[from] sluice_types::EncodeError),

    /// A stored row could not be decoded back into an event.
    #[error("invalid stored row: {0}")]
    InvalidRow(String),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
