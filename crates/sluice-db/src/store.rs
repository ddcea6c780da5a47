//! The event store capability interface.
//!
//! The retention core never talks to a database directly. It issues the
//! handful of operations below, and the store is responsible for making
//! concurrent reads, writes and deletes safe. Every backend in this crate
//! implements [`EventStore`]; [`StoreBackend`](crate::StoreBackend)
//! picks one at configuration time.

use std::future::Future;

use chrono::{DateTime, Utc};
use sluice_types::{Category, Event, Identity, RowId, StoredEvent};

use crate::error::DbError;

/// Result of a persist call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The event was inserted under this row key.
    Inserted(RowId),
    /// An event with the same id was already stored; nothing was written.
    Duplicate,
}

/// Persist, query and delete operations the retention core depends on.
///
/// Timestamps are compared at whole-second resolution, which is the
/// resolution events carry on the wire.
pub trait EventStore: Send + Sync {
    /// Insert an event, or report that its id is already stored.
    fn persist(&self, event: &Event) -> impl Future<Output = Result<SaveOutcome, DbError>> + Send;

    /// Timestamp of the `n`-th most recent event for the pair.
    ///
    /// `n` is 1-based: `n = 1` is the newest event. Returns `None` when
    /// the pair holds fewer than `n` events (or `n` is zero).
    fn nth_most_recent_timestamp(
        &self,
        identity: &Identity,
        category: Category,
        n: u32,
    ) -> impl Future<Output = Result<Option<DateTime<Utc>>, DbError>> + Send;

    /// Delete every event for the pair with `created_at < boundary`.
    fn delete_identity_older_than(
        &self,
        identity: &Identity,
        category: Category,
        boundary: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Delete every event in the store with `created_at < cutoff`.
    fn delete_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Number of events stored for the pair.
    fn count_for(
        &self,
        identity: &Identity,
        category: Category,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// All events stored for the pair, newest first.
    fn events_for(
        &self,
        identity: &Identity,
        category: Category,
    ) -> impl Future<Output = Result<Vec<StoredEvent>, DbError>> + Send;
}

/// Convert a 1-based rank into the SQL `OFFSET` that selects it.
pub(crate) fn rank_offset(n: u32) -> Option<i64> {
    n.checked_sub(1).map(i64::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_offset_is_zero_based() {
        assert_eq!(rank_offset(0), None);
        assert_eq!(rank_offset(1), Some(0));
        assert_eq!(rank_offset(100), Some(99));
    }
}
