//! Row mapping shared by the SQL backends.

use chrono::{DateTime, Utc};
use sluice_types::{Category, Event, EventId, Identity, RowId, StoredEvent};

use crate::error::DbError;

/// A row from the `events` table.
///
/// Both SQL backends store `created_at` as unix seconds and `tags` as JSON
/// text, so a single row type decodes either of them.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Store-assigned row key.
    pub id: i64,
    /// Producer-supplied event key.
    pub event_id: String,
    /// Owner key.
    pub identity: String,
    /// Event kind.
    pub category: i32,
    /// Creation time in unix seconds.
    pub created_at: i64,
    /// Tags as a JSON array of arrays.
    pub tags: String,
    /// Event body.
    pub content: String,
    /// Opaque signature.
    pub sig: String,
}

impl EventRow {
    /// Decode the row back into a [`StoredEvent`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] if a column holds a value no event
    /// could have been persisted with.
    pub fn into_stored(self) -> Result<StoredEvent, DbError> {
        let category = Category::from_db(self.category).ok_or_else(|| {
            DbError::InvalidRow(format!("category {} out of range", self.category))
        })?;
        let created_at = timestamp_from_db(self.created_at)?;
        let tags: Vec<Vec<String>> = serde_json::from_str(&self.tags)
            .map_err(|e| DbError::InvalidRow(format!("tags for row {}: {e}", self.id)))?;

        Ok(StoredEvent {
            row_id: RowId(self.id),
            event: Event {
                id: EventId(self.event_id),
                identity: Identity(self.identity),
                created_at,
                category,
                tags,
                content: self.content,
                sig: self.sig,
            },
        })
    }
}

/// Convert a unix-seconds column into a timestamp.
///
/// # Errors
///
/// Returns [`DbError::InvalidRow`] if the value is outside chrono's range.
pub fn timestamp_from_db(secs: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| DbError::InvalidRow(format!("timestamp {secs} out of range")))
}

/// Convert a timestamp into the unix-seconds column value.
pub fn timestamp_to_db(at: DateTime<Utc>) -> i64 {
    at.timestamp()
}
