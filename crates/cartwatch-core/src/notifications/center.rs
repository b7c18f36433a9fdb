//! Async facade over the notification store.
//!
//! Local mutations are optimistic: the store changes first, then the
//! change is written through to the server with a bounded retry budget.
//! A change that never reaches the server keeps its local effect and the
//! caller gets [`CoreError::RemoteOutOfSync`] to surface as a warning.

use std::sync::{Arc, Mutex};

use chrono::Local;
use tracing::{debug, warn};

use crate::error::{CoreError, Result, SourceError};
use crate::notifications::model::{Notification, NotificationSummary};
use crate::notifications::store::NotificationStore;
use crate::preferences::PreferencesStore;
use crate::remote::NotificationSource;

/// Attempts per remote write-through before giving up.
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

#[derive(Clone, Copy)]
enum WriteOp<'a> {
    Acknowledge(&'a str),
    Dismiss(&'a str),
}

impl WriteOp<'_> {
    fn name(&self) -> &'static str {
        match self {
            WriteOp::Acknowledge(_) => "acknowledge",
            WriteOp::Dismiss(_) => "dismiss",
        }
    }
}

/// Owner of the notification working set and its remote write-through.
///
/// Cheap to clone; clones share the same store, source, and preferences.
#[derive(Clone)]
pub struct NotificationCenter {
    store: Arc<Mutex<NotificationStore>>,
    source: Arc<dyn NotificationSource>,
    prefs: Arc<PreferencesStore>,
    retry_limit: u32,
}

impl NotificationCenter {
    pub fn new(source: Arc<dyn NotificationSource>, prefs: Arc<PreferencesStore>) -> Self {
        Self {
            store: Arc::new(Mutex::new(NotificationStore::new())),
            source,
            prefs,
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }

    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Fetch a snapshot without touching the store. The poller separates
    /// this from [`NotificationCenter::apply_snapshot`] so a stale
    /// in-flight result can still be discarded after the fetch resolves.
    pub async fn fetch_snapshot(&self) -> Result<Vec<Notification>, SourceError> {
        self.source.fetch_notifications().await
    }

    /// Fetch the server-computed summary. Informational only: the local
    /// recount is authoritative and a divergence is logged, not adopted.
    pub async fn fetch_remote_summary(&self) -> Result<NotificationSummary, SourceError> {
        self.source.fetch_summary().await
    }

    /// Reconcile a fetched snapshot into the store and return the fresh
    /// local recount.
    pub fn apply_snapshot(&self, snapshot: Vec<Notification>) -> NotificationSummary {
        let prefs = self.prefs.current();
        let mut store = self.store.lock().unwrap();
        store.ingest(snapshot, &prefs);
        store.summary()
    }

    /// Fetch and reconcile in one step. On fetch failure the previous
    /// store state is retained and the error is returned for the caller
    /// to log; the next poll tick is the retry.
    pub async fn refresh(&self) -> Result<NotificationSummary> {
        let snapshot = self.fetch_snapshot().await?;
        let remote_summary = self.fetch_remote_summary().await.ok();
        let summary = self.apply_snapshot(snapshot);
        if let Some(remote) = remote_summary {
            check_divergence(&remote, &summary);
        }
        Ok(summary)
    }

    /// Acknowledge a notification: local read flag first, then remote
    /// write-through. An id the store no longer holds is a silent no-op.
    pub async fn mark_read(&self, id: &str) -> Result<()> {
        let changed = self.store.lock().unwrap().mark_read(id);
        if !changed {
            return Ok(());
        }
        self.write_through(WriteOp::Acknowledge(id)).await
    }

    /// Dismiss a notification: tombstone locally first, then remote
    /// write-through. An id the store no longer holds is a silent no-op.
    pub async fn dismiss(&self, id: &str) -> Result<()> {
        let changed = self.store.lock().unwrap().dismiss(id);
        if !changed {
            return Ok(());
        }
        self.write_through(WriteOp::Dismiss(id)).await
    }

    pub fn active(&self) -> Vec<Notification> {
        self.store.lock().unwrap().active()
    }

    pub fn summary(&self) -> NotificationSummary {
        self.store.lock().unwrap().summary()
    }

    /// Quiet-hours check against local wall-clock time, for hosts that
    /// decide whether to surface what the store holds.
    pub fn suppressed_now(&self) -> bool {
        self.prefs.current().suppressed_at(Local::now().time())
    }

    async fn write_through(&self, op: WriteOp<'_>) -> Result<()> {
        let attempts = self.retry_limit.max(1);
        let mut last: Option<SourceError> = None;

        for attempt in 1..=attempts {
            let result = match op {
                WriteOp::Acknowledge(id) => self.source.acknowledge(id).await,
                WriteOp::Dismiss(id) => self.source.dismiss_remote(id).await,
            };
            match result {
                Ok(()) => {
                    if attempt > 1 {
                        debug!(operation = op.name(), attempt, "remote write-through recovered");
                    }
                    return Ok(());
                }
                Err(err) => {
                    debug!(
                        operation = op.name(),
                        attempt,
                        error = %err,
                        "remote write-through failed"
                    );
                    last = Some(err);
                }
            }
        }

        match last {
            Some(source) => {
                warn!(
                    operation = op.name(),
                    attempts, "remote write-through exhausted retries; local state kept"
                );
                Err(CoreError::RemoteOutOfSync {
                    operation: op.name(),
                    attempts,
                    source,
                })
            }
            None => Ok(()),
        }
    }
}

pub(crate) fn check_divergence(remote: &NotificationSummary, local: &NotificationSummary) {
    if remote.total_active != local.total_active {
        debug!(
            remote = remote.total_active,
            local = local.total_active,
            "server summary diverges from local recount; local recount wins"
        );
    }
}
