//! Sluice relay binary.
//!
//! Wires the retention core to a store, the admin API and an optional
//! stdin event feed, then runs until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `sluice-config.yaml` (or defaults + env)
//! 2. Initialize structured logging (tracing)
//! 3. Open the event store and run migrations
//! 4. Build the relay policy and start the purge scheduler
//! 5. Start the admin API server
//! 6. Start the stdin event feed, if enabled
//! 7. Wait for `Ctrl-C`, then stop everything in reverse order

mod error;
mod feed;

use std::path::Path;
use std::sync::Arc;

use sluice_admin::{AppState, ServerConfig};
use sluice_core::config::{LogFormat, LoggingConfig};
use sluice_core::{RelayPolicy, ShutdownSignal, SluiceConfig, SystemClock};
use sluice_db::StoreBackend;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::RelayError;

/// Configuration file looked up in the working directory.
const CONFIG_PATH: &str = "sluice-config.yaml";

/// Application entry point for the relay.
///
/// # Errors
///
/// Returns an error if configuration, the store, or the admin server
/// cannot be brought up, or if a background task panics.
#[tokio::main]
async fn main() -> Result<(), RelayError> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        relay = config.relay.name,
        backend = %config.store.backend,
        max_event_bytes = config.admission.max_event_bytes,
        retention_count = config.retention.retention_count,
        retention_age_months = config.retention.retention_age_months,
        purge_interval_secs = config.retention.purge_interval_secs,
        "sluice-relay starting"
    );

    // 3. Open the store.
    let store = Arc::new(
        StoreBackend::connect(
            config.store.backend,
            &config.store.url,
            config.store.max_connections,
        )
        .await?,
    );

    // 4. Policy and purge scheduler.
    let policy = Arc::new(RelayPolicy::from_config(
        &config,
        Arc::clone(&store),
        Arc::new(SystemClock),
    ));
    let scheduler = policy.on_init();

    let shutdown = ShutdownSignal::new();

    // 5. Admin API.
    let admin = if config.admin.enabled {
        let server = ServerConfig {
            host: config.admin.host.clone(),
            port: config.admin.port,
        };
        let state = Arc::new(AppState::new(Arc::clone(&policy)));
        Some(sluice_admin::spawn_admin(server, state, shutdown.clone())?)
    } else {
        info!("Admin API disabled");
        None
    };

    // 6. Stdin feed.
    let feed = if config.ingest.stdin {
        info!("Reading newline-delimited events from stdin");
        let lines = feed::spawn_line_reader(std::io::BufReader::new(std::io::stdin()))?;
        Some(tokio::spawn(feed::run_feed(
            lines,
            Arc::clone(&policy),
            shutdown.clone(),
        )))
    } else {
        None
    };

    // 7. Run until interrupted.
    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    shutdown.request();

    if let Some(feed) = feed {
        if let Err(e) = feed.await? {
            tracing::warn!(error = %e, "Event feed stopped with error");
        }
    }
    if let Some(admin) = admin {
        admin.await?;
    }
    let cycles = scheduler.stop().await?;
    store.close().await;

    let stats = policy.stats().snapshot();
    info!(
        purge_cycles = cycles,
        accepted = stats.accepted,
        rejected = stats.rejected,
        events_trimmed = stats.events_trimmed,
        events_purged = stats.events_purged,
        "sluice-relay shutdown complete"
    );

    Ok(())
}

/// Load configuration from [`CONFIG_PATH`] if present, otherwise from
/// defaults plus environment overrides.
fn load_config() -> Result<SluiceConfig, RelayError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok(SluiceConfig::from_file(config_path)?)
    } else {
        Ok(SluiceConfig::from_env()?)
    }
}

/// Install the global tracing subscriber. `RUST_LOG` takes precedence
/// over the configured level.
fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}
