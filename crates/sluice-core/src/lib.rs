//! Admission and retention policy for the Sluice event relay.
//!
//! An event arrives, the [`AdmissionGate`] checks it, the store persists
//! it, and the [`RetentionEnforcer`] immediately trims that event's
//! `(identity, category)` pair back to the newest N events. Independently,
//! the [`PurgeScheduler`] wakes on a fixed interval and purges every
//! event older than the retention age across the whole store.
//!
//! # Modules
//!
//! - [`admission`] -- Size and kind checks run before persistence.
//! - [`clock`] -- [`Clock`] trait with system and manual implementations.
//! - [`config`] -- Configuration loading from `sluice-config.yaml` plus
//!   environment overrides.
//! - [`policy`] -- [`RelayPolicy`] hooks tying the pieces together.
//! - [`retention`] -- Per-identity trim and global age purge.
//! - [`scheduler`] -- Background purge loop with cooperative shutdown.
//! - [`stats`] -- Lock-free retention counters.

pub mod admission;
pub mod clock;
pub mod config;
pub mod policy;
pub mod retention;
pub mod scheduler;
pub mod stats;

#[cfg(test)]
mod testing;

pub use admission::{Admission, AdmissionGate, RejectReason};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SluiceConfig;
pub use policy::{IngestError, IngestOutcome, RelayPolicy};
pub use retention::{PurgeOutcome, RetentionEnforcer, RetentionError, TrimOutcome};
pub use scheduler::{PurgeScheduler, SchedulerError, SchedulerHandle, ShutdownSignal};
pub use stats::{RetentionStats, StatsSnapshot};
