//! The retention enforcer: per-identity trim and global age purge.
//!
//! Both rules only ever delete. Both are idempotent and convergent: running
//! either one again after it has succeeded deletes nothing, and running it
//! after a failure picks up exactly where the failed run would have left
//! off. Nothing here retries on its own. The next write to a pair retries
//! its trim, and the next scheduler tick retries the purge.
//!
//! # Relaxed bound
//!
//! "At most N events per pair" holds only once trims have run after the
//! last write, and only when timestamps at the boundary are unique.
//! Events sharing the boundary timestamp survive together, and two
//! concurrent writers to the same pair can each read a boundary before
//! either delete lands, leaving the pair briefly above N until a later
//! trim.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sluice_db::{DbError, EventStore};
use sluice_types::{Category, Identity};

use crate::clock::{Clock, months_before};
use crate::config::RetentionConfig;
use crate::stats::RetentionStats;

/// Errors from a retention run. Any of them means the store was
/// unavailable; the run can simply be repeated later.
#[derive(Debug, thiserror::Error)]
pub enum RetentionError {
    /// The store failed a query or delete.
    #[error("store unavailable: {0}")]
    Store(#[from] DbError),
}

/// Result of a per-identity trim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimOutcome {
    /// The pair holds fewer than N events; nothing to do.
    Skipped,
    /// Everything strictly older than `boundary` was deleted.
    Trimmed {
        /// Timestamp of the N-th most recent event.
        boundary: DateTime<Utc>,
        /// Rows removed (zero if the pair held exactly N).
        deleted: u64,
    },
}

impl TrimOutcome {
    /// Rows removed by this trim.
    pub const fn deleted(&self) -> u64 {
        match self {
            Self::Skipped => 0,
            Self::Trimmed { deleted, .. } => *deleted,
        }
    }
}

/// Result of a global purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeOutcome {
    /// Events strictly older than this were deleted.
    pub cutoff: DateTime<Utc>,
    /// Rows removed.
    pub deleted: u64,
}

/// Applies both retention rules against an [`EventStore`].
pub struct RetentionEnforcer<S> {
    store: Arc<S>,
    retention_count: u32,
    retention_age_months: u32,
    clock: Arc<dyn Clock>,
    stats: Arc<RetentionStats>,
}

impl<S: EventStore> RetentionEnforcer<S> {
    /// Create an enforcer keeping `retention_count` events per pair and
    /// purging events older than `retention_age_months`.
    pub fn new(
        store: Arc<S>,
        retention_count: u32,
        retention_age_months: u32,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            retention_count,
            retention_age_months,
            clock,
            stats: Arc::new(RetentionStats::new()),
        }
    }

    /// Create an enforcer from configuration.
    pub fn from_config(store: Arc<S>, config: &RetentionConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            store,
            config.retention_count,
            config.retention_age_months,
            clock,
        )
    }

    /// The store this enforcer deletes from.
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Counters this enforcer records into.
    pub const fn stats(&self) -> &Arc<RetentionStats> {
        &self.stats
    }

    /// Events kept per pair.
    pub const fn retention_count(&self) -> u32 {
        self.retention_count
    }

    /// Maximum event age in calendar months.
    pub const fn retention_age_months(&self) -> u32 {
        self.retention_age_months
    }

    /// Keep only the `retention_count` most recent events for the pair.
    ///
    /// Finds the timestamp of the N-th most recent event and deletes every
    /// event for the pair strictly older than it. A pair with fewer than N
    /// events is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`RetentionError::Store`] if either the boundary query or
    /// the delete fails. Nothing is undone; a later trim converges.
    pub async fn trim_identity(
        &self,
        identity: &Identity,
        category: Category,
    ) -> Result<TrimOutcome, RetentionError> {
        let outcome = self.trim_inner(identity, category).await;
        match &outcome {
            Ok(trim) => {
                self.stats.record_trim(trim.deleted());
                if trim.deleted() > 0 {
                    tracing::debug!(
                        %identity,
                        %category,
                        deleted = trim.deleted(),
                        "Trimmed events beyond retention count"
                    );
                }
            }
            Err(_) => self.stats.record_trim_failure(),
        }
        outcome
    }

    async fn trim_inner(
        &self,
        identity: &Identity,
        category: Category,
    ) -> Result<TrimOutcome, RetentionError> {
        let Some(boundary) = self
            .store
            .nth_most_recent_timestamp(identity, category, self.retention_count)
            .await?
        else {
            return Ok(TrimOutcome::Skipped);
        };

        let deleted = self
            .store
            .delete_identity_older_than(identity, category, boundary)
            .await?;

        Ok(TrimOutcome::Trimmed { boundary, deleted })
    }

    /// The cutoff a purge run right now would use.
    pub fn purge_cutoff(&self) -> DateTime<Utc> {
        months_before(self.clock.now(), self.retention_age_months)
    }

    /// Delete every event, across all pairs, with a timestamp strictly
    /// before `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns [`RetentionError::Store`] if the delete fails.
    pub async fn purge_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<PurgeOutcome, RetentionError> {
        match self.store.delete_older_than(cutoff).await {
            Ok(deleted) => {
                self.stats.record_purge(deleted, self.clock.now());
                tracing::info!(%cutoff, deleted, "Purged events past retention age");
                Ok(PurgeOutcome { cutoff, deleted })
            }
            Err(e) => {
                self.stats.record_purge_failure();
                Err(e.into())
            }
        }
    }

    /// Purge with the cutoff derived from the clock and retention age.
    ///
    /// # Errors
    ///
    /// Returns [`RetentionError::Store`] if the delete fails.
    pub async fn purge_expired(&self) -> Result<PurgeOutcome, RetentionError> {
        self.purge_older_than(self.purge_cutoff()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use chrono::{TimeDelta, TimeZone};
    use sluice_db::{MemoryEventStore, SaveOutcome};
    use sluice_types::Event;

    use super::*;
    use crate::clock::ManualClock;
    use crate::testing::FlakyStore;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn enforcer(count: u32) -> RetentionEnforcer<MemoryEventStore> {
        RetentionEnforcer::new(
            Arc::new(MemoryEventStore::new()),
            count,
            3,
            Arc::new(ManualClock::new(now())),
        )
    }

    async fn insert(
        store: &impl EventStore,
        id: &str,
        identity: &str,
        category: u16,
        at: DateTime<Utc>,
    ) {
        let outcome = store
            .persist(&Event::new(id, identity, category, at))
            .await
            .unwrap();
        assert!(matches!(outcome, SaveOutcome::Inserted(_)));
    }

    async fn fill(store: &impl EventStore, identity: &str, n: i64) {
        for i in 0..n {
            let at = now() + TimeDelta::seconds(i);
            insert(store, &format!("{identity}-{i}"), identity, 1, at).await;
        }
    }

    #[tokio::test]
    async fn fewer_than_n_is_skipped() {
        let enforcer = enforcer(5);
        fill(enforcer.store().as_ref(), "u1", 4).await;

        let outcome = enforcer.trim_identity(&Identity::from("u1"), Category(1)).await.unwrap();

        assert_eq!(outcome, TrimOutcome::Skipped);
        assert_eq!(enforcer.store().len().await, 4);
    }

    #[tokio::test]
    async fn exactly_n_is_a_no_op() {
        let enforcer = enforcer(5);
        fill(enforcer.store().as_ref(), "u1", 5).await;

        let outcome = enforcer.trim_identity(&Identity::from("u1"), Category(1)).await.unwrap();

        assert_eq!(
            outcome,
            TrimOutcome::Trimmed {
                boundary: now(),
                deleted: 0
            }
        );
        assert_eq!(enforcer.store().len().await, 5);
    }

    #[tokio::test]
    async fn n_plus_one_drops_only_the_oldest() {
        let enforcer = enforcer(5);
        fill(enforcer.store().as_ref(), "u1", 6).await;
        let identity = Identity::from("u1");

        let outcome = enforcer.trim_identity(&identity, Category(1)).await.unwrap();

        assert_eq!(outcome.deleted(), 1);
        let left = enforcer.store().events_for(&identity, Category(1)).await.unwrap();
        assert_eq!(left.len(), 5);
        assert!(left.iter().all(|s| s.event.id.as_str() != "u1-0"));
    }

    #[tokio::test]
    async fn boundary_ties_survive_together() {
        let enforcer = enforcer(2);
        let store = enforcer.store().as_ref();
        insert(store, "old", "u1", 1, now()).await;
        insert(store, "tie-a", "u1", 1, now() + TimeDelta::seconds(5)).await;
        insert(store, "tie-b", "u1", 1, now() + TimeDelta::seconds(5)).await;
        insert(store, "new", "u1", 1, now() + TimeDelta::seconds(9)).await;

        let outcome = enforcer.trim_identity(&Identity::from("u1"), Category(1)).await.unwrap();

        // Boundary is the second newest (a tie); only "old" is strictly older.
        assert_eq!(outcome.deleted(), 1);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn trim_leaves_other_pairs_alone() {
        let enforcer = enforcer(2);
        let store = enforcer.store().as_ref();
        fill(store, "u1", 4).await;
        fill(store, "u2", 4).await;
        insert(store, "u1-kind7", "u1", 7, now() - TimeDelta::days(1)).await;

        enforcer.trim_identity(&Identity::from("u1"), Category(1)).await.unwrap();

        assert_eq!(store.count_for(&Identity::from("u1"), Category(1)).await.unwrap(), 2);
        assert_eq!(store.count_for(&Identity::from("u1"), Category(7)).await.unwrap(), 1);
        assert_eq!(store.count_for(&Identity::from("u2"), Category(1)).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn purge_cutoff_is_three_months_back() {
        let enforcer = enforcer(100);
        assert_eq!(
            enforcer.purge_cutoff(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn purge_removes_only_events_before_cutoff() {
        let enforcer = enforcer(100);
        let store = enforcer.store().as_ref();
        let cutoff = enforcer.purge_cutoff();
        insert(store, "old-1", "u1", 1, cutoff - TimeDelta::seconds(1)).await;
        insert(store, "old-2", "u2", 3, cutoff - TimeDelta::days(30)).await;
        insert(store, "edge", "u3", 1, cutoff).await;
        insert(store, "new", "u1", 1, cutoff + TimeDelta::days(1)).await;

        let first = enforcer.purge_expired().await.unwrap();
        let second = enforcer.purge_older_than(cutoff).await.unwrap();

        assert_eq!(first, PurgeOutcome { cutoff, deleted: 2 });
        assert_eq!(second.deleted, 0);
        assert_eq!(store.len().await, 2);
        assert_eq!(enforcer.stats().snapshot().events_purged, 2);
        assert_eq!(enforcer.stats().purges_run(), 2);
    }

    #[tokio::test]
    async fn failed_trim_converges_on_the_next_run() {
        let store = Arc::new(FlakyStore::default());
        let enforcer = RetentionEnforcer::new(
            Arc::clone(&store),
            3,
            3,
            Arc::new(ManualClock::new(now())),
        );
        fill(store.as_ref(), "u1", 5).await;
        let identity = Identity::from("u1");

        store.set_down(true);
        assert!(enforcer.trim_identity(&identity, Category(1)).await.is_err());
        assert_eq!(store.count_for(&identity, Category(1)).await.unwrap(), 5);

        store.set_down(false);
        let outcome = enforcer.trim_identity(&identity, Category(1)).await.unwrap();
        assert_eq!(outcome.deleted(), 2);
        assert_eq!(store.count_for(&identity, Category(1)).await.unwrap(), 3);

        let snap = enforcer.stats().snapshot();
        assert_eq!(snap.trim_failures, 1);
        assert_eq!(snap.trims_run, 1);
    }

    #[tokio::test]
    async fn failed_purge_is_reported_and_counted() {
        let store = Arc::new(FlakyStore::default());
        let enforcer = RetentionEnforcer::new(
            Arc::clone(&store),
            3,
            3,
            Arc::new(ManualClock::new(now())),
        );
        store.set_down(true);

        let result = enforcer.purge_expired().await;

        assert!(matches!(result, Err(RetentionError::Store(_))));
        let snap = enforcer.stats().snapshot();
        assert_eq!(snap.purge_failures, 1);
        assert_eq!(snap.purges_run, 0);
        assert!(snap.last_purge_at.is_none());
    }
}
