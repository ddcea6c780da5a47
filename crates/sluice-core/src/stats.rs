//! Lock-free retention counters.
//!
//! Every write context and the purge task bump these with relaxed atomics;
//! the admin API reads a [`StatsSnapshot`]. Counters are monotone for the
//! life of the process and reset on restart.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Sentinel for "no purge has completed yet".
const NEVER: i64 = i64::MIN;

/// Shared retention counters.
#[derive(Debug)]
pub struct RetentionStats {
    accepted: AtomicU64,
    rejected: AtomicU64,
    duplicates: AtomicU64,
    trims_run: AtomicU64,
    trim_failures: AtomicU64,
    events_trimmed: AtomicU64,
    purges_run: AtomicU64,
    purge_failures: AtomicU64,
    events_purged: AtomicU64,
    last_purge_at: AtomicI64,
}

impl Default for RetentionStats {
    fn default() -> Self {
        Self {
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            trims_run: AtomicU64::new(0),
            trim_failures: AtomicU64::new(0),
            events_trimmed: AtomicU64::new(0),
            purges_run: AtomicU64::new(0),
            purge_failures: AtomicU64::new(0),
            events_purged: AtomicU64::new(0),
            last_purge_at: AtomicI64::new(NEVER),
        }
    }
}

/// Point-in-time copy of [`RetentionStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Events that passed the admission gate.
    pub accepted: u64,
    /// Events the admission gate rejected.
    pub rejected: u64,
    /// Admitted events the store already held.
    pub duplicates: u64,
    /// Per-identity trims that completed.
    pub trims_run: u64,
    /// Per-identity trims that hit a store failure.
    pub trim_failures: u64,
    /// Events deleted by per-identity trims.
    pub events_trimmed: u64,
    /// Global purges that completed.
    pub purges_run: u64,
    /// Global purges that hit a store failure.
    pub purge_failures: u64,
    /// Events deleted by global purges.
    pub events_purged: u64,
    /// Completion time of the last successful purge.
    pub last_purge_at: Option<DateTime<Utc>>,
}

fn bump(counter: &AtomicU64, by: u64) {
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
        Some(v.saturating_add(by))
    });
}

impl RetentionStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_accepted(&self) {
        bump(&self.accepted, 1);
    }

    pub(crate) fn record_rejected(&self) {
        bump(&self.rejected, 1);
    }

    pub(crate) fn record_duplicate(&self) {
        bump(&self.duplicates, 1);
    }

    pub(crate) fn record_trim(&self, deleted: u64) {
        bump(&self.trims_run, 1);
        bump(&self.events_trimmed, deleted);
    }

    pub(crate) fn record_trim_failure(&self) {
        bump(&self.trim_failures, 1);
    }

    pub(crate) fn record_purge(&self, deleted: u64, at: DateTime<Utc>) {
        bump(&self.purges_run, 1);
        bump(&self.events_purged, deleted);
        self.last_purge_at.store(at.timestamp(), Ordering::Relaxed);
    }

    pub(crate) fn record_purge_failure(&self) {
        bump(&self.purge_failures, 1);
    }

    /// Number of completed global purges.
    pub fn purges_run(&self) -> u64 {
        self.purges_run.load(Ordering::Relaxed)
    }

    /// Copy every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        let last = self.last_purge_at.load(Ordering::Relaxed);
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            trims_run: self.trims_run.load(Ordering::Relaxed),
            trim_failures: self.trim_failures.load(Ordering::Relaxed),
            events_trimmed: self.events_trimmed.load(Ordering::Relaxed),
            purges_run: self.purges_run.load(Ordering::Relaxed),
            purge_failures: self.purge_failures.load(Ordering::Relaxed),
            events_purged: self.events_purged.load(Ordering::Relaxed),
            last_purge_at: if last == NEVER {
                None
            } else {
                DateTime::from_timestamp(last, 0)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_stats_are_zero() {
        let snap = RetentionStats::new().snapshot();
        assert_eq!(snap.accepted, 0);
        assert_eq!(snap.purges_run, 0);
        assert!(snap.last_purge_at.is_none());
    }

    #[test]
    fn counters_accumulate() {
        let stats = RetentionStats::new();
        stats.record_accepted();
        stats.record_accepted();
        stats.record_rejected();
        stats.record_trim(3);
        stats.record_trim(0);
        stats.record_purge(10, Utc::now());

        let snap = stats.snapshot();
        assert_eq!(snap.accepted, 2);
        assert_eq!(snap.rejected, 1);
        assert_eq!(snap.trims_run, 2);
        assert_eq!(snap.events_trimmed, 3);
        assert_eq!(snap.events_purged, 10);
        assert!(snap.last_purge_at.is_some());
    }
}
