//! Configuration-time backend selection.
//!
//! [`StoreBackend`] is the one concrete store the relay runs against. It
//! wraps whichever backend [`BackendKind`] names and forwards every
//! [`EventStore`] call to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sluice_types::{Category, Event, Identity, StoredEvent};

use crate::error::DbError;
use crate::memory::MemoryEventStore;
use crate::postgres::{PostgresConfig, PostgresEventStore, PostgresPool};
use crate::sqlite::{SqliteConfig, SqliteEventStore};
use crate::store::{EventStore, SaveOutcome};

/// Which storage engine backs the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// `PostgreSQL` via a connection pool.
    #[default]
    Postgres,
    /// `SQLite` file (or `sqlite::memory:`).
    Sqlite,
    /// Process memory; nothing is durable.
    Memory,
}

impl core::str::FromStr for BackendKind {
    type Err = DbError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(DbError::Config(format!("unknown store backend: {other}"))),
        }
    }
}

impl core::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
        };
        f.write_str(name)
    }
}

/// The event store selected at startup.
pub enum StoreBackend {
    /// `PostgreSQL` backend.
    Postgres(PostgresEventStore),
    /// `SQLite` backend.
    Sqlite(SqliteEventStore),
    /// In-memory backend.
    Memory(MemoryEventStore),
}

impl StoreBackend {
    /// Open the backend named by `kind` and bring its schema up to date.
    ///
    /// `url` is ignored for [`BackendKind::Memory`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or migrations fail.
    pub async fn connect(
        kind: BackendKind,
        url: &str,
        max_connections: u32,
    ) -> Result<Self, DbError> {
        let backend = match kind {
            BackendKind::Postgres => {
                let config = PostgresConfig::new(url).with_max_connections(max_connections);
                let pool = PostgresPool::connect(&config).await?;
                pool.run_migrations().await?;
                Self::Postgres(PostgresEventStore::new(pool))
            }
            BackendKind::Sqlite => {
                let config = SqliteConfig::new(url).with_max_connections(max_connections);
                Self::Sqlite(SqliteEventStore::connect(&config).await?)
            }
            BackendKind::Memory => Self::Memory(MemoryEventStore::new()),
        };
        tracing::info!(backend = %backend.kind(), "Event store ready");
        Ok(backend)
    }

    /// Which engine this is.
    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::Postgres(_) => BackendKind::Postgres,
            Self::Sqlite(_) => BackendKind::Sqlite,
            Self::Memory(_) => BackendKind::Memory,
        }
    }

    /// Close pooled connections. A no-op for the memory backend.
    pub async fn close(&self) {
        match self {
            Self::Postgres(store) => store.pool().close().await,
            Self::Sqlite(store) => store.close().await,
            Self::Memory(_) => {}
        }
    }
}

impl EventStore for StoreBackend {
    async fn persist(&self, event: &Event) -> Result<SaveOutcome, DbError> {
        match self {
            Self::Postgres(store) => store.persist(event).await,
            Self::Sqlite(store) => store.persist(event).await,
            Self::Memory(store) => store.persist(event).await,
        }
    }

    async fn nth_most_recent_timestamp(
        &self,
        identity: &Identity,
        category: Category,
        n: u32,
    ) -> Result<Option<DateTime<Utc>>, DbError> {
        match self {
            Self::Postgres(store) => store.nth_most_recent_timestamp(identity, category, n).await,
            Self::Sqlite(store) => store.nth_most_recent_timestamp(identity, category, n).await,
            Self::Memory(store) => store.nth_most_recent_timestamp(identity, category, n).await,
        }
    }

    async fn delete_identity_older_than(
        &self,
        identity: &Identity,
        category: Category,
        boundary: DateTime<Utc>,
    ) -> Result<u64, DbError> {
        match self {
            Self::Postgres(store) => {
                store
                    .delete_identity_older_than(identity, category, boundary)
                    .await
            }
            Self::Sqlite(store) => {
                store
                    .delete_identity_older_than(identity, category, boundary)
                    .await
            }
            Self::Memory(store) => {
                store
                    .delete_identity_older_than(identity, category, boundary)
                    .await
            }
        }
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        match self {
            Self::Postgres(store) => store.delete_older_than(cutoff).await,
            Self::Sqlite(store) => store.delete_older_than(cutoff).await,
            Self::Memory(store) => store.delete_older_than(cutoff).await,
        }
    }

    async fn count_for(&self, identity: &Identity, category: Category) -> Result<u64, DbError> {
        match self {
            Self::Postgres(store) => store.count_for(identity, category).await,
            Self::Sqlite(store) => store.count_for(identity, category).await,
            Self::Memory(store) => store.count_for(identity, category).await,
        }
    }

    async fn events_for(
        &self,
        identity: &Identity,
        category: Category,
    ) -> Result<Vec<StoredEvent>, DbError> {
        match self {
            Self::Postgres(store) => store.events_for(identity, category).await,
            Self::Sqlite(store) => store.events_for(identity, category).await,
            Self::Memory(store) => store.events_for(identity, category).await,
        }
    }
}
