//! Admin server startup helper for embedding in the relay binary.
//!
//! Provides [`spawn_admin`] which launches the admin HTTP server on a
//! background Tokio task, so the API runs alongside ingestion and the
//! purge scheduler.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sluice_admin::startup::spawn_admin;
//! use sluice_admin::{AppState, ServerConfig};
//! use sluice_core::ShutdownSignal;
//! use std::sync::Arc;
//!
//! let shutdown = ShutdownSignal::new();
//! let state = Arc::new(AppState::new(policy));
//! let handle = spawn_admin(ServerConfig::default(), state, shutdown.clone())?;
//! // ... later
//! shutdown.request();
//! handle.await?;
//! ```

use std::sync::Arc;

use sluice_core::ShutdownSignal;
use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the admin server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Spawn the admin HTTP server on a background Tokio task.
///
/// The address is validated before the task is spawned; the actual bind
/// happens inside the task, and a bind failure there is logged. The
/// server stops once `shutdown` is raised; await the returned handle to
/// wait for it.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if `config` does not describe a valid
/// socket address.
pub fn spawn_admin(
    config: ServerConfig,
    state: Arc<AppState>,
    shutdown: ShutdownSignal,
) -> Result<JoinHandle<()>, StartupError> {
    let addr = config.socket_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = crate::server::start_server(&config, state, shutdown).await {
            tracing::error!(error = %e, "Admin server exited with error");
        }
    });

    tracing::info!(%addr, "Admin server spawned on background task");

    Ok(handle)
}
