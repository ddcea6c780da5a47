//! Shared application state for the admin API server.
//!
//! [`AppState`] wraps the same [`RelayPolicy`] the ingest path uses, so
//! admin-triggered trims and purges go through the same enforcer and
//! record into the same counters.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sluice_core::RelayPolicy;
use sluice_db::StoreBackend;

/// State shared by every admin handler.
pub struct AppState {
    /// The relay's admission and retention policy.
    pub policy: Arc<RelayPolicy<StoreBackend>>,
    /// When the server state was created.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wrap a policy, stamping the start time now.
    pub fn new(policy: Arc<RelayPolicy<StoreBackend>>) -> Self {
        Self {
            policy,
            started_at: Utc::now(),
        }
    }

    /// Whole seconds since the state was created.
    pub fn uptime_secs(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds()
            .max(0)
    }
}
