//! `SQLite` event store.
//!
//! A single-file backend for small relays and for tests. Shares the row
//! layout of the `PostgreSQL` backend; `tags` is plain JSON text.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sluice_types::{Category, Event, Identity, RowId, StoredEvent};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::DbError;
use crate::row::{EventRow, timestamp_from_db, timestamp_to_db};
use crate::store::{EventStore, SaveOutcome, rank_offset};

/// URL of a private in-memory database.
pub const IN_MEMORY_URL: &str = "sqlite::memory:";

/// Default maximum number of connections in the pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// Default connection timeout in seconds.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Configuration for the `SQLite` connection pool.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// `SQLite` connection URL, e.g. `sqlite://relay.db`.
    pub url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Whether idle connections may be closed. An in-memory database
    /// lives exactly as long as its connection, so it must never idle out.
    pub expire_idle: bool,
}

impl SqliteConfig {
    /// Create a new configuration from a database URL.
    ///
    /// An in-memory URL keeps its connections open for the life of the
    /// pool.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            expire_idle: !url.contains(":memory:"),
        }
    }

    /// Configuration for a private in-memory database on one connection.
    pub fn in_memory() -> Self {
        Self {
            url: IN_MEMORY_URL.to_owned(),
            max_connections: 1,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            expire_idle: false,
        }
    }

    /// Set the maximum number of connections.
    #[must_use]
    pub const fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}

/// [`EventStore`] over the `events` table in `SQLite`.
#[derive(Clone)]
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Open (creating if missing) the database and run migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed,
    /// [`DbError::Sql`] if the connection fails, or
    /// [`DbError::Migration`] if the schema cannot be applied.
    pub async fn connect(config: &SqliteConfig) -> Result<Self, DbError> {
        let connect_options: SqliteConnectOptions = config
            .url
            .parse::<SqliteConnectOptions>()
            .map_err(|e| DbError::Config(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true);

        let mut options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout);
        if !config.expire_idle {
            options = options.idle_timeout(None).max_lifetime(None);
        }
        let pool = options.connect_with(connect_options).await?;

        sqlx::migrate!("./migrations_sqlite").run(&pool).await?;

        tracing::info!(
            url = config.url,
            max_connections = config.max_connections,
            "Opened SQLite event store"
        );

        Ok(Self { pool })
    }

    /// Close all connections in the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("SQLite pool closed");
    }
}

impl EventStore for SqliteEventStore {
    async fn persist(&self, event: &Event) -> Result<SaveOutcome, DbError> {
        let tags = event.tags_json()?;
        let inserted: Option<i64> = sqlx::query_scalar(
            r"INSERT INTO events (event_id, identity, category, created_at, tags, content, sig)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
              ON CONFLICT (event_id) DO NOTHING
              RETURNING id",
        )
        .bind(event.id.as_str())
        .bind(event.identity.as_str())
        .bind(event.category.to_db())
        .bind(timestamp_to_db(event.created_at))
        .bind(&tags)
        .bind(&event.content)
        .bind(&event.sig)
        .fetch_optional(&self.pool)
        .await?;

        Ok(inserted.map_or(SaveOutcome::Duplicate, |id| SaveOutcome::Inserted(RowId(id))))
    }

    async fn nth_most_recent_timestamp(
        &self,
        identity: &Identity,
        category: Category,
        n: u32,
    ) -> Result<Option<DateTime<Utc>>, DbError> {
        let Some(offset) = rank_offset(n) else {
            return Ok(None);
        };
        let boundary: Option<i64> = sqlx::query_scalar(
            r"SELECT created_at FROM events
              WHERE identity = ?1 AND category = ?2
              ORDER BY created_at DESC
              LIMIT 1 OFFSET ?3",
        )
        .bind(identity.as_str())
        .bind(category.to_db())
        .bind(offset)
        .fetch_optional(&self.pool)
        .await?;

        boundary.map(timestamp_from_db).transpose()
    }

    async fn delete_identity_older_than(
        &self,
        identity: &Identity,
        category: Category,
        boundary: DateTime<Utc>,
    ) -> Result<u64, DbError> {
        let result = sqlx::query(
            r"DELETE FROM events
              WHERE identity = ?1 AND category = ?2 AND created_at < ?3",
        )
        .bind(identity.as_str())
        .bind(category.to_db())
        .bind(timestamp_to_db(boundary))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM events WHERE created_at < ?1")
            .bind(timestamp_to_db(cutoff))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn count_for(&self, identity: &Identity, category: Category) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM events WHERE identity = ?1 AND category = ?2",
        )
        .bind(identity.as_str())
        .bind(category.to_db())
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn events_for(
        &self,
        identity: &Identity,
        category: Category,
    ) -> Result<Vec<StoredEvent>, DbError> {
        let rows = sqlx::query_as::<_, EventRow>(
            r"SELECT id, event_id, identity, category, created_at, tags, content, sig
              FROM events
              WHERE identity = ?1 AND category = ?2
              ORDER BY created_at DESC, id DESC",
        )
        .bind(identity.as_str())
        .bind(category.to_db())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EventRow::into_stored).collect()
    }
}
