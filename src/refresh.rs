//! Background snapshot refresh
//!
//! A single tokio task polls the upstream immediately on start and then on a
//! fixed interval, publishing each good response to the [`SnapshotStore`]. A
//! failed tick leaves the previous snapshot in place; the next tick is the
//! retry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::{SnapshotMirror, SnapshotStore};
use crate::data::{FetchError, Snapshot, SnapshotSource, DEFAULT_FETCH_TIMEOUT};

/// Configuration for the refresh loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Time between the starts of consecutive ticks
    pub interval: Duration,
    /// Upper bound on a single upstream fetch
    pub timeout: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// What a single tick did
#[derive(Debug)]
pub enum RefreshOutcome {
    /// A new snapshot was published
    Updated {
        captured_at: DateTime<Utc>,
        /// Whether the mirror file was written (false when no mirror is set)
        mirrored: bool,
    },
    /// The fetch failed; the store was left untouched
    Failed(FetchError),
    /// Another refresh was still in flight, so this tick did nothing
    Skipped,
}

impl RefreshOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, RefreshOutcome::Updated { .. })
    }
}

/// Clears the in-flight flag even if the refresh future is dropped midway
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Pulls from a [`SnapshotSource`] and publishes into a [`SnapshotStore`]
pub struct Refresher<S> {
    source: S,
    store: Arc<SnapshotStore>,
    mirror: Option<SnapshotMirror>,
    timeout: Duration,
    in_flight: AtomicBool,
}

impl<S: SnapshotSource> Refresher<S> {
    pub fn new(source: S, store: Arc<SnapshotStore>, timeout: Duration) -> Self {
        Self {
            source,
            store,
            mirror: None,
            timeout,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Also write each new snapshot to a mirror file
    pub fn with_mirror(mut self, mirror: SnapshotMirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// The store this refresher publishes into, for wiring up readers
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Runs exactly one tick and reports what happened
    ///
    /// Returns [`RefreshOutcome::Skipped`] without contacting the upstream if
    /// another call is still running.
    pub async fn refresh_once(&self) -> RefreshOutcome {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("refresh already in flight; skipping tick");
            return RefreshOutcome::Skipped;
        }
        let _guard = InFlight(&self.in_flight);

        let fetched = match tokio::time::timeout(self.timeout, self.source.fetch_latest()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        };

        match fetched {
            Ok(payload) => {
                let captured_at = Utc::now();
                let snapshot = self.store.replace(payload, captured_at);
                info!(timestamp = %captured_at, "timetables updated");

                let mirrored = self.write_mirror(snapshot).await;
                RefreshOutcome::Updated {
                    captured_at,
                    mirrored,
                }
            }
            Err(err) => {
                warn!(
                    kind = %err.kind(),
                    error = %err,
                    stale = self.store.is_ready(),
                    "error fetching timetables; keeping previous snapshot"
                );
                RefreshOutcome::Failed(err)
            }
        }
    }

    /// Writes the mirror off the async workers; failures are logged only
    async fn write_mirror(&self, snapshot: Arc<Snapshot>) -> bool {
        let Some(mirror) = self.mirror.clone() else {
            return false;
        };

        match tokio::task::spawn_blocking(move || mirror.write(&snapshot)).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                warn!(error = %err, "failed to write snapshot mirror");
                false
            }
            Err(err) => {
                warn!(error = %err, "snapshot mirror task failed");
                false
            }
        }
    }
}

/// Handle for controlling the background refresh task
pub struct RefreshHandle {
    /// Out-of-schedule refresh requests; capacity 1 so requests coalesce
    trigger_tx: mpsc::Sender<()>,
    /// Signals the task to stop
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Spawns the refresh loop
    ///
    /// The first tick runs immediately. If a scheduled tick comes due while a
    /// refresh (scheduled or requested) is still running, that tick is skipped
    /// and the next one is one full interval after the refresh completes, so
    /// ticks never queue up behind a slow upstream. Dropping the handle stops
    /// the loop.
    pub fn spawn<S>(refresher: Arc<Refresher<S>>, interval: Duration) -> Self
    where
        S: SnapshotSource + 'static,
    {
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(1);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // Deadline of the next scheduled tick
            let mut next_due = Instant::now();

            loop {
                tokio::select! {
                    due = ticker.tick() => next_due = due + interval,
                    Some(()) = trigger_rx.recv() => {
                        debug!("manual refresh requested");
                    }
                    _ = shutdown_rx.recv() => break,
                }

                let started = Instant::now();
                tokio::select! {
                    _ = refresher.refresh_once() => {}
                    _ = shutdown_rx.recv() => break,
                }

                // Requests that arrived mid-refresh are dropped, not replayed
                while trigger_rx.try_recv().is_ok() {}

                // A tick that came due mid-refresh is dropped too
                if Instant::now() >= next_due {
                    debug!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "tick came due during refresh; rescheduling from completion"
                    );
                    ticker.reset();
                }
            }

            debug!("refresh loop stopped");
        });

        Self {
            trigger_tx,
            shutdown_tx,
            task,
        }
    }

    /// Requests an immediate refresh
    ///
    /// Returns `false` if a request is already pending or the loop has stopped.
    pub fn request_refresh(&self) -> bool {
        self.trigger_tx.try_send(()).is_ok()
    }

    /// Stops the refresh loop and waits for it to finish
    ///
    /// An in-flight upstream call is abandoned.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(err) = self.task.await {
            warn!(error = %err, "refresh task ended abnormally");
        }
    }
}
