//! Newline-delimited JSON event feed.
//!
//! Each non-blank line is one event object. Lines are ingested in order
//! through [`RelayPolicy::ingest`], so the feed sees exactly the admission
//! and trim behavior a network transport would. Malformed lines and store
//! failures are logged and skipped; the feed only stops at end of input
//! or on shutdown.
//!
//! Lines arrive over a channel fed by [`spawn_line_reader`], which does the
//! blocking reads on its own OS thread. A read parked on an idle input then
//! never holds up runtime shutdown.

use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;

use sluice_core::{IngestOutcome, RelayPolicy, ShutdownSignal};
use sluice_db::EventStore;
use sluice_types::Event;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::RelayError;

/// Per-feed tallies, logged when the feed ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    /// Events written to the store.
    pub stored: u64,
    /// Events already present.
    pub duplicates: u64,
    /// Events refused by the admission gate.
    pub rejected: u64,
    /// Lines that were not valid event JSON.
    pub malformed: u64,
    /// Events lost to a store failure.
    pub failed: u64,
}

/// Lines buffered between the reader thread and the feed.
const LINE_BUFFER: usize = 256;

/// Receiving half of a line source.
pub type LineReceiver = mpsc::Receiver<io::Result<String>>;

/// Read lines from `reader` on a dedicated thread.
///
/// The thread exits at end of input, after forwarding a read error, or once
/// the returned receiver is dropped.
///
/// # Errors
///
/// Returns [`RelayError::Io`] if the thread cannot be spawned.
pub fn spawn_line_reader<R>(reader: R) -> Result<LineReceiver, RelayError>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    thread::Builder::new()
        .name("sluice-feed-reader".to_owned())
        .spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// Ingest events from `lines` until the sender closes or `shutdown`.
///
/// # Errors
///
/// Returns [`RelayError::Io`] if the line source reports a read failure.
pub async fn run_feed<S>(
    mut lines: LineReceiver,
    policy: Arc<RelayPolicy<S>>,
    shutdown: ShutdownSignal,
) -> Result<FeedSummary, RelayError>
where
    S: EventStore + 'static,
{
    let mut summary = FeedSummary::default();

    loop {
        let line = tokio::select! {
            biased;
            () = shutdown.wait() => break,
            line = lines.recv() => line,
        };
        let Some(line) = line.transpose()? else { break };
        if line.trim().is_empty() {
            continue;
        }

        let event: Event = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Skipping malformed event line");
                summary.malformed = summary.malformed.saturating_add(1);
                continue;
            }
        };

        match policy.ingest(&event).await {
            Ok(IngestOutcome::Stored { row_id, .. }) => {
                debug!(event_id = %event.id, %row_id, "Stored event");
                summary.stored = summary.stored.saturating_add(1);
            }
            Ok(IngestOutcome::Duplicate(_)) => {
                summary.duplicates = summary.duplicates.saturating_add(1);
            }
            Ok(IngestOutcome::Rejected(reason)) => {
                info!(event_id = %event.id, %reason, "Event rejected");
                summary.rejected = summary.rejected.saturating_add(1);
            }
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "Failed to store event");
                summary.failed = summary.failed.saturating_add(1);
            }
        }
    }

    info!(
        stored = summary.stored,
        duplicates = summary.duplicates,
        rejected = summary.rejected,
        malformed = summary.malformed,
        failed = summary.failed,
        "Event feed ended"
    );
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use chrono::{TimeDelta, TimeZone, Utc};
    use sluice_core::{ManualClock, SluiceConfig};
    use sluice_db::MemoryEventStore;
    use sluice_types::{Category, Identity};

    use super::*;

    fn policy(retention_count: u32) -> Arc<RelayPolicy<MemoryEventStore>> {
        let mut config = SluiceConfig::default();
        config.retention.retention_count = retention_count;
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        ));
        Arc::new(RelayPolicy::from_config(
            &config,
            Arc::new(MemoryEventStore::new()),
            clock,
        ))
    }

    fn line(id: &str, secs: i64) -> String {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + TimeDelta::seconds(secs);
        serde_json::to_string(&Event::new(id, "u1", 1, at)).unwrap()
    }

    fn lines_of(input: String) -> LineReceiver {
        spawn_line_reader(Cursor::new(input.into_bytes())).unwrap()
    }

    #[tokio::test]
    async fn feed_ingests_each_line() {
        let policy = policy(2);
        let input = [
            line("a", 1),
            String::new(),
            line("b", 2),
            String::from("{ not json"),
            line("b", 2),
            line("c", 3),
        ]
        .join("\n");

        let summary = run_feed(lines_of(input), Arc::clone(&policy), ShutdownSignal::new())
            .await
            .unwrap();

        assert_eq!(
            summary,
            FeedSummary {
                stored: 3,
                duplicates: 1,
                rejected: 0,
                malformed: 1,
                failed: 0,
            }
        );
        let count = policy
            .store()
            .count_for(&Identity::from("u1"), Category(1))
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn oversized_lines_are_rejected() {
        let policy = policy(100);
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let big = Event::new("big", "u1", 1, at).with_content("x".repeat(20_000));
        let input = serde_json::to_string(&big).unwrap();

        let summary = run_feed(lines_of(input), policy, ShutdownSignal::new())
            .await
            .unwrap();

        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.stored, 0);
    }

    #[tokio::test]
    async fn raised_shutdown_stops_before_reading() {
        let shutdown = ShutdownSignal::new();
        shutdown.request();

        let summary = run_feed(lines_of(line("a", 1)), policy(100), shutdown)
            .await
            .unwrap();

        assert_eq!(summary, FeedSummary::default());
    }

    #[tokio::test]
    async fn shutdown_stops_feed_while_input_is_open() {
        let policy = policy(100);
        let shutdown = ShutdownSignal::new();
        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        let feed = tokio::spawn(run_feed(rx, Arc::clone(&policy), shutdown.clone()));

        tx.send(Ok(line("a", 1))).await.unwrap();
        tokio::task::yield_now().await;
        shutdown.request();

        let summary = tokio::time::timeout(Duration::from_secs(5), feed)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(summary.stored <= 1);
        // The feed let go of its receiver while the sender was still open.
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn read_failure_ends_feed_with_error() {
        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        tx.send(Err(io::Error::other("broken pipe"))).await.unwrap();

        let result = run_feed(rx, policy(100), ShutdownSignal::new()).await;

        assert!(matches!(result, Err(RelayError::Io { .. })));
    }
}
