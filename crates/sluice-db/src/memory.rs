//! In-memory event store.
//!
//! Holds every event in a [`BTreeMap`] behind a [`tokio::sync::RwLock`].
//! Meant for tests and for throwaway relays; nothing survives a restart.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use sluice_types::{Category, Event, EventId, Identity, RowId, StoredEvent};
use tokio::sync::RwLock;

use crate::error::DbError;
use crate::store::{EventStore, SaveOutcome};

#[derive(Debug, Default)]
struct Tables {
    rows: BTreeMap<RowId, StoredEvent>,
    event_ids: HashSet<EventId>,
    next_row: i64,
}

impl Tables {
    fn pair<'a>(
        &'a self,
        identity: &'a Identity,
        category: Category,
    ) -> impl Iterator<Item = &'a StoredEvent> + 'a {
        self.rows
            .values()
            .filter(move |s| s.event.identity == *identity && s.event.category == category)
    }

    fn remove_where(&mut self, mut doomed: impl FnMut(&Event) -> bool) -> u64 {
        let mut removed: u64 = 0;
        let event_ids = &mut self.event_ids;
        self.rows.retain(|_, stored| {
            if doomed(&stored.event) {
                event_ids.remove(&stored.event.id);
                removed = removed.saturating_add(1);
                false
            } else {
                true
            }
        });
        removed
    }
}

/// [`EventStore`] kept entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    tables: RwLock<Tables>,
}

impl MemoryEventStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored events across every pair.
    pub async fn len(&self) -> usize {
        self.tables.read().await.rows.len()
    }

    /// Whether the store holds no events at all.
    pub async fn is_empty(&self) -> bool {
        self.tables.read().await.rows.is_empty()
    }
}

impl EventStore for MemoryEventStore {
    async fn persist(&self, event: &Event) -> Result<SaveOutcome, DbError> {
        let mut tables = self.tables.write().await;
        if tables.event_ids.contains(&event.id) {
            return Ok(SaveOutcome::Duplicate);
        }
        tables.next_row = tables.next_row.saturating_add(1);
        let row_id = RowId(tables.next_row);
        tables.event_ids.insert(event.id.clone());
        tables.rows.insert(
            row_id,
            StoredEvent {
                row_id,
                event: event.clone(),
            },
        );
        Ok(SaveOutcome::Inserted(row_id))
    }

    async fn nth_most_recent_timestamp(
        &self,
        identity: &Identity,
        category: Category,
        n: u32,
    ) -> Result<Option<DateTime<Utc>>, DbError> {
        let Some(skip) = n.checked_sub(1) else {
            return Ok(None);
        };
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let tables = self.tables.read().await;
        let mut stamps: Vec<DateTime<Utc>> = tables
            .pair(identity, category)
            .map(|s| s.event.created_at)
            .collect();
        stamps.sort_unstable_by(|a, b| b.cmp(a));
        Ok(stamps.into_iter().nth(skip))
    }

    async fn delete_identity_older_than(
        &self,
        identity: &Identity,
        category: Category,
        boundary: DateTime<Utc>,
    ) -> Result<u64, DbError> {
        let mut tables = self.tables.write().await;
        Ok(tables.remove_where(|e| {
            e.identity == *identity && e.category == category && e.created_at < boundary
        }))
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let mut tables = self.tables.write().await;
        Ok(tables.remove_where(|e| e.created_at < cutoff))
    }

    async fn count_for(&self, identity: &Identity, category: Category) -> Result<u64, DbError> {
        let tables = self.tables.read().await;
        let count = tables.pair(identity, category).count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn events_for(
        &self,
        identity: &Identity,
        category: Category,
    ) -> Result<Vec<StoredEvent>, DbError> {
        let tables = self.tables.read().await;
        let mut events: Vec<StoredEvent> = tables.pair(identity, category).cloned().collect();
        events.sort_by(|a, b| {
            b.event
                .created_at
                .cmp(&a.event.created_at)
                .then_with(|| b.row_id.cmp(&a.row_id))
        });
        Ok(events)
    }
}
