//! Wall-clock abstraction for retention cutoffs.
//!
//! The purge cutoff is `now - retention age`, so the enforcer reads "now"
//! through [`Clock`] instead of calling [`Utc::now`] directly. Production
//! uses [`SystemClock`]; tests use [`ManualClock`] to pin or move time.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Months, TimeDelta, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Second resolution.
#[derive(Debug)]
pub struct ManualClock {
    secs: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `at`.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            secs: AtomicI64::new(at.timestamp()),
        }
    }

    /// Move forward by `delta` (saturating).
    pub fn advance(&self, delta: TimeDelta) {
        let step = delta.num_seconds();
        let _ = self
            .secs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                Some(s.saturating_add(step))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.secs.load(Ordering::Acquire), 0)
            .unwrap_or(DateTime::UNIX_EPOCH)
    }
}

/// `now` minus `months` calendar months, clamped at the Unix epoch.
///
/// Calendar arithmetic clamps the day of month, so three months before
/// May 31st is February 28th (or 29th).
pub fn months_before(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(months))
        .map_or(DateTime::UNIX_EPOCH, |cutoff| cutoff.max(DateTime::UNIX_EPOCH))
}
