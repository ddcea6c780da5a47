//! Test doubles shared by the unit tests in this crate.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use sluice_db::{DbError, EventStore, MemoryEventStore, SaveOutcome};
use sluice_types::{Category, Event, Identity, StoredEvent};

/// A memory store whose deletes fail while `down` is set.
#[derive(Debug, Default)]
pub(crate) struct FlakyStore {
    inner: MemoryEventStore,
    down: AtomicBool,
}

impl FlakyStore {
    pub(crate) fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::Release);
    }

    fn check(&self) -> Result<(), DbError> {
        if self.down.load(Ordering::Acquire) {
            Err(DbError::Config("store offline".to_owned()))
        } else {
            Ok(())
        }
    }
}

impl EventStore for FlakyStore {
    async fn persist(&self, event: &Event) -> Result<SaveOutcome, DbError> {
        self.inner.persist(event).await
    }

    async fn nth_most_recent_timestamp(
        &self,
        identity: &Identity,
        category: Category,
        n: u32,
    ) -> Result<Option<DateTime<Utc>>, DbError> {
        self.inner
            .nth_most_recent_timestamp(identity, category, n)
            .await
    }

    async fn delete_identity_older_than(
        &self,
        identity: &Identity,
        category: Category,
        boundary: DateTime<Utc>,
    ) -> Result<u64, DbError> {
        self.check()?;
        self.inner
            .delete_identity_older_than(identity, category, boundary)
            .await
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        self.check()?;
        self.inner.delete_older_than(cutoff).await
    }

    async fn count_for(&self, identity: &Identity, category: Category) -> Result<u64, DbError> {
        self.inner.count_for(identity, category).await
    }

    async fn events_for(
        &self,
        identity: &Identity,
        category: Category,
    ) -> Result<Vec<StoredEvent>, DbError> {
        self.inner.events_for(identity, category).await
    }
}
