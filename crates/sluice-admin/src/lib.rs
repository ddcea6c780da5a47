//! Admin API server for the Sluice relay.
//!
//! This crate provides an Axum HTTP server for operators:
//!
//! - **Status** (`GET /`, `GET /api/status`) showing the relay's limits
//!   and retention counters
//! - **Manual retention** (`POST /api/retention/purge`,
//!   `POST /api/retention/trim`) running the same idempotent operations
//!   the scheduler and ingest path run
//! - **Inspection** of per-pair counts and dry-run admission checks
//!
//! All handlers share one [`AppState`] wrapping the relay's
//! [`RelayPolicy`](sluice_core::RelayPolicy).

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;

// Re-export primary types for convenience.
pub use error::AdminError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{StartupError, spawn_admin};
pub use state::AppState;
