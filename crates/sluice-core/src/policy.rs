//! Relay policy hooks.
//!
//! [`RelayPolicy`] is what a relay transport plugs into: an admission hook
//! before persistence, a post-persist hook that trims the writer's pair,
//! and a start-up hook that launches the purge scheduler. [`RelayPolicy::ingest`]
//! strings them together for callers that own no store logic of their own
//! (the stdin feed, tests).
//!
//! ```text
//! event -> accept_event -> persist -> after_save (trim pair)
//!                                         |
//! on_init -> PurgeScheduler ---- every interval ---> purge_expired
//! ```

use std::sync::Arc;
use std::time::Duration;

use sluice_db::{DbError, EventStore, SaveOutcome};
use sluice_types::{Event, EventId, RowId};
use tracing::{debug, warn};

use crate::admission::{Admission, AdmissionGate, RejectReason};
use crate::clock::Clock;
use crate::config::SluiceConfig;
use crate::retention::{RetentionEnforcer, RetentionError, TrimOutcome};
use crate::scheduler::{PurgeScheduler, SchedulerHandle};
use crate::stats::RetentionStats;

/// Errors from [`RelayPolicy::ingest`].
///
/// Only a failed persist is an error. A failed trim after a successful
/// persist is reported inside [`IngestOutcome::Stored`].
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The store could not persist the event.
    #[error("store unavailable: {0}")]
    Store(#[from] DbError),
}

/// What happened to an ingested event.
#[derive(Debug)]
pub enum IngestOutcome {
    /// The admission gate refused it; nothing was written.
    Rejected(RejectReason),
    /// An event with this id is already stored; nothing was written or
    /// trimmed.
    Duplicate(EventId),
    /// The event was written, then its pair was trimmed.
    Stored {
        /// Row id assigned by the store.
        row_id: RowId,
        /// Result of the best-effort trim. An error here never undoes the
        /// write.
        trim: Result<TrimOutcome, RetentionError>,
    },
}

impl IngestOutcome {
    /// Whether the event ended up in the store as a new row.
    pub const fn is_stored(&self) -> bool {
        matches!(self, Self::Stored { .. })
    }
}

/// Admission and retention policy for one relay.
pub struct RelayPolicy<S> {
    name: String,
    gate: AdmissionGate,
    enforcer: Arc<RetentionEnforcer<S>>,
    purge_interval: Duration,
}

impl<S: EventStore + 'static> RelayPolicy<S> {
    /// Assemble a policy from its parts.
    pub fn new(
        name: impl Into<String>,
        gate: AdmissionGate,
        enforcer: RetentionEnforcer<S>,
        purge_interval: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            gate,
            enforcer: Arc::new(enforcer),
            purge_interval,
        }
    }

    /// Build the policy described by `config` over `store`.
    pub fn from_config(config: &SluiceConfig, store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            config.relay.name.clone(),
            AdmissionGate::from_config(&config.admission),
            RetentionEnforcer::from_config(store, &config.retention, clock),
            config.retention.purge_interval(),
        )
    }

    /// Relay name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The admission gate.
    pub const fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// The retention enforcer, for direct trims and purges.
    pub const fn enforcer(&self) -> &Arc<RetentionEnforcer<S>> {
        &self.enforcer
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        self.enforcer.store()
    }

    /// Shared retention counters.
    pub fn stats(&self) -> &Arc<RetentionStats> {
        self.enforcer.stats()
    }

    /// Interval between scheduled purges.
    pub const fn purge_interval(&self) -> Duration {
        self.purge_interval
    }

    /// Admission hook: decide whether `event` may be stored.
    pub fn accept_event(&self, event: &Event) -> Admission {
        let admission = self.gate.admit(event);
        match admission.reason() {
            None => self.stats().record_accepted(),
            Some(reason) => {
                self.stats().record_rejected();
                debug!(
                    event_id = %event.id,
                    identity = %event.identity,
                    %reason,
                    "Rejected event"
                );
            }
        }
        admission
    }

    /// Post-persist hook: trim the pair `event` was written to.
    ///
    /// # Errors
    ///
    /// Returns the [`RetentionError`] of a failed trim after logging it.
    /// The stored event stays; the next write to the pair retries.
    pub async fn after_save(&self, event: &Event) -> Result<TrimOutcome, RetentionError> {
        let result = self
            .enforcer
            .trim_identity(&event.identity, event.category)
            .await;
        if let Err(ref e) = result {
            warn!(
                identity = %event.identity,
                category = %event.category,
                error = %e,
                "Trim after save failed"
            );
        }
        result
    }

    /// Start-up hook: launch the purge scheduler.
    pub fn on_init(&self) -> SchedulerHandle {
        PurgeScheduler::new(Arc::clone(&self.enforcer), self.purge_interval).spawn()
    }

    /// Admit, persist, then trim a single event.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Store`] if the persist fails. Rejections,
    /// duplicates and trim failures are outcomes, not errors.
    pub async fn ingest(&self, event: &Event) -> Result<IngestOutcome, IngestError> {
        if let Admission::Rejected(reason) = self.accept_event(event) {
            return Ok(IngestOutcome::Rejected(reason));
        }

        match self.store().persist(event).await? {
            SaveOutcome::Duplicate => {
                self.stats().record_duplicate();
                debug!(event_id = %event.id, "Duplicate event ignored");
                Ok(IngestOutcome::Duplicate(event.id.clone()))
            }
            SaveOutcome::Inserted(row_id) => {
                let trim = self.after_save(event).await;
                Ok(IngestOutcome::Stored { row_id, trim })
            }
        }
    }
}
