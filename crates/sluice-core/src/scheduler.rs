//! The purge scheduler: one background task running the global age purge
//! on a fixed interval.
//!
//! The first purge runs one interval after [`PurgeScheduler::spawn`], then
//! once per interval for as long as the handle is alive. There is no
//! jitter or backoff, and nothing is persisted between restarts.
//!
//! Shutdown is cooperative. [`SchedulerHandle::stop`] raises the
//! [`ShutdownSignal`], which the loop only observes while sleeping: a
//! purge that has started always runs to completion, and cycles never
//! overlap.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sluice_db::EventStore;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::retention::{PurgeOutcome, RetentionEnforcer, RetentionError};

/// Errors from stopping the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The purge task panicked or was aborted.
    #[error("purge task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

// ---------------------------------------------------------------------------
// ShutdownSignal
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SignalInner {
    requested: AtomicBool,
    notify: Notify,
}

/// A one-shot, cloneable shutdown flag with async wake-up.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<SignalInner>,
}

impl ShutdownSignal {
    /// Create an unraised signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal and wake every waiter. Idempotent.
    pub fn request(&self) {
        self.inner.requested.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    /// Whether the signal has been raised.
    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::Acquire)
    }

    /// Wait until the signal is raised. Returns immediately if it already is.
    pub async fn wait(&self) {
        loop {
            // Register before checking the flag so a request between the
            // check and the await is not missed.
            let notified = self.inner.notify.notified();
            if self.is_requested() {
                return;
            }
            notified.await;
        }
    }
}

// ---------------------------------------------------------------------------
// PurgeScheduler
// ---------------------------------------------------------------------------

/// Runs [`RetentionEnforcer::purge_expired`] every `interval`.
pub struct PurgeScheduler<S> {
    enforcer: Arc<RetentionEnforcer<S>>,
    interval: Duration,
    shutdown: ShutdownSignal,
}

impl<S: EventStore + 'static> PurgeScheduler<S> {
    /// Create a scheduler that has not started yet.
    pub fn new(enforcer: Arc<RetentionEnforcer<S>>, interval: Duration) -> Self {
        Self {
            enforcer,
            interval,
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Run a single purge cycle now, logging a failure.
    ///
    /// # Errors
    ///
    /// Returns the [`RetentionError`] of a failed purge. The scheduler
    /// itself never acts on it beyond logging; the next tick retries.
    pub async fn run_once(&self) -> Result<PurgeOutcome, RetentionError> {
        let result = self.enforcer.purge_expired().await;
        if let Err(ref e) = result {
            warn!(error = %e, "Purge cycle failed, retrying next interval");
        }
        result
    }

    /// Start the background loop.
    pub fn spawn(self) -> SchedulerHandle {
        let shutdown = self.shutdown.clone();
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting purge scheduler"
        );
        let task = tokio::spawn(self.run());
        SchedulerHandle { shutdown, task }
    }

    async fn run(self) -> u64 {
        let mut cycles: u64 = 0;
        loop {
            tokio::select! {
                biased;
                () = self.shutdown.wait() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
            let _ = self.run_once().await;
            cycles = cycles.saturating_add(1);
        }
        info!(cycles, "Purge scheduler stopped");
        cycles
    }
}

/// Owner of a running [`PurgeScheduler`] task.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: ShutdownSignal,
    task: JoinHandle<u64>,
}

impl SchedulerHandle {
    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal shutdown and wait for the loop to exit, letting any
    /// in-flight purge finish first. Returns the number of cycles run.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Join`] if the task panicked.
    pub async fn stop(self) -> Result<u64, SchedulerError> {
        self.shutdown.request();
        Ok(self.task.await?)
    }
}
