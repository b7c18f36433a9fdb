//! Periodic refresh of the notification working set.
//!
//! One tick = one snapshot fetch + ingest. Ticks never overlap: the loop
//! awaits each fetch inline, so a tick that would fire mid-fetch is
//! skipped rather than queued. A fetch that fails or overruns its timeout
//! leaves the previous store state in place; the next scheduled tick is
//! the retry.
//!
//! Stopping bumps a generation counter. An in-flight fetch whose
//! generation is stale by the time it resolves is discarded before it can
//! touch the store, so a stopped or restarted poller can never apply an
//! out-of-date snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::notifications::center::{check_divergence, NotificationCenter};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30_000;
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;

/// Poller cadence knobs.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Delay between ticks in milliseconds.
    pub interval_ms: u64,
    /// Bound on a single snapshot fetch; an overrun counts as a failed tick.
    pub fetch_timeout_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
        }
    }
}

impl PollerConfig {
    pub fn with_interval(mut self, ms: u64) -> Self {
        self.interval_ms = ms;
        self
    }

    pub fn with_fetch_timeout(mut self, ms: u64) -> Self {
        self.fetch_timeout_ms = ms;
        self
    }
}

/// Interval-driven refresher for a [`NotificationCenter`].
pub struct NotificationPoller {
    center: NotificationCenter,
    config: PollerConfig,
    generation: Arc<AtomicU64>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl NotificationPoller {
    pub fn new(center: NotificationCenter, config: PollerConfig) -> Self {
        Self {
            center,
            config,
            generation: Arc::new(AtomicU64::new(0)),
            shutdown_tx: None,
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    /// Start polling. The first fetch happens immediately, then every
    /// `interval_ms`. Restarting invalidates any fetch still in flight
    /// from the previous run.
    pub fn start(&mut self) {
        self.stop();
        let my_gen = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let center = self.center.clone();
        let generation = self.generation.clone();
        let config = self.config.clone();

        let handle = tokio::spawn(async move {
            info!(interval_ms = config.interval_ms, "notification poller started");
            let interval = Duration::from_millis(config.interval_ms.max(1));
            let fetch_timeout = Duration::from_millis(config.fetch_timeout_ms.max(1));

            loop {
                poll_tick(&center, &generation, my_gen, fetch_timeout).await;
                if generation.load(Ordering::SeqCst) != my_gen {
                    break;
                }
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("notification poller stopped");
                        break;
                    }
                    _ = sleep(interval) => {}
                }
            }
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.handle = Some(handle);
    }

    /// Stop polling and invalidate any in-flight fetch.
    pub fn stop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for NotificationPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One poll tick: bounded fetch, then ingest only if the poller
/// generation is still current. A stop or restart mid-fetch makes the
/// result stale and it is dropped on the floor.
async fn poll_tick(
    center: &NotificationCenter,
    generation: &AtomicU64,
    my_gen: u64,
    fetch_timeout: Duration,
) {
    let snapshot = match timeout(fetch_timeout, center.fetch_snapshot()).await {
        Ok(Ok(snapshot)) => snapshot,
        Ok(Err(err)) => {
            warn!(error = %err, "poll fetch failed; keeping previous state");
            return;
        }
        Err(_) => {
            warn!(
                timeout_ms = fetch_timeout.as_millis() as u64,
                "poll fetch timed out; keeping previous state"
            );
            return;
        }
    };
    let remote_summary = match timeout(fetch_timeout, center.fetch_remote_summary()).await {
        Ok(Ok(summary)) => Some(summary),
        _ => None,
    };

    if generation.load(Ordering::SeqCst) != my_gen {
        debug!("discarding stale poll result");
        return;
    }

    let summary = center.apply_snapshot(snapshot);
    if let Some(remote) = remote_summary {
        check_divergence(&remote, &summary);
    }
    debug!(active = summary.total_active, "poll applied");
}
