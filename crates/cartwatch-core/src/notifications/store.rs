//! Local working set of notifications.
//!
//! The store reconciles server snapshots with local read/dismiss state.
//! Dismissing tombstones the id, so a late or concurrent poll response
//! cannot resurrect the record -- the ordering guarantee comes from the
//! tombstone, not from locking. Tombstones are cleared once the server
//! stops returning the id, or once they age past the resync horizon.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use crate::notifications::model::{Notification, NotificationSummary};
use crate::preferences::NotificationPreferences;

/// Default window after which a dismissal is trusted to have reached the
/// server and its tombstone is dropped at the next resync.
pub const DEFAULT_RESYNC_HORIZON_MINS: i64 = 10;

#[derive(Debug, Clone)]
pub struct NotificationStore {
    records: HashMap<String, Notification>,
    /// Dismissed ids by dismissal time. An id present here is never
    /// surfaced, even if a poll snapshot still contains it.
    tombstones: HashMap<String, DateTime<Utc>>,
    resync_horizon: Duration,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            tombstones: HashMap::new(),
            resync_horizon: Duration::minutes(DEFAULT_RESYNC_HORIZON_MINS),
        }
    }

    pub fn with_resync_horizon(mut self, horizon: Duration) -> Self {
        self.resync_horizon = horizon;
        self
    }

    /// Reconcile the working set with a fresh server snapshot.
    pub fn ingest(&mut self, snapshot: Vec<Notification>, prefs: &NotificationPreferences) {
        self.ingest_at(snapshot, prefs, Utc::now());
    }

    /// [`NotificationStore::ingest`] with an explicit clock.
    ///
    /// - A tombstoned id stays absent even if the snapshot carries it.
    /// - Known ids are upserted; a locally-set `read` is sticky until the
    ///   record disappears from the snapshot.
    /// - New ids pass the category gate once, here; preference changes do
    ///   not retroactively filter records already ingested.
    /// - Local records absent from the snapshot expired server-side and
    ///   are removed.
    pub fn ingest_at(
        &mut self,
        snapshot: Vec<Notification>,
        prefs: &NotificationPreferences,
        now: DateTime<Utc>,
    ) {
        let snapshot_ids: HashSet<&str> = snapshot.iter().map(|n| n.id.as_str()).collect();
        let horizon = self.resync_horizon;
        self.tombstones
            .retain(|id, dismissed_at| snapshot_ids.contains(id.as_str()) && now - *dismissed_at < horizon);

        let mut next = HashMap::with_capacity(snapshot.len());
        for mut incoming in snapshot {
            if incoming.dismissed || self.tombstones.contains_key(&incoming.id) {
                continue;
            }
            match self.records.remove(&incoming.id) {
                Some(existing) => {
                    incoming.read = incoming.read || existing.read;
                    next.insert(incoming.id.clone(), incoming);
                }
                None => {
                    if prefs.allows(incoming.kind) {
                        next.insert(incoming.id.clone(), incoming);
                    }
                }
            }
        }
        self.records = next;
    }

    /// Mark a record read. Returns whether anything changed; an absent or
    /// already-read id is a silent no-op (the record may have just expired).
    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.records.get_mut(id) {
            Some(n) if !n.read => {
                n.read = true;
                true
            }
            _ => false,
        }
    }

    /// Remove a record from the active set and tombstone its id.
    /// Returns whether anything changed; an absent id is a silent no-op.
    pub fn dismiss(&mut self, id: &str) -> bool {
        self.dismiss_at(id, Utc::now())
    }

    /// [`NotificationStore::dismiss`] with an explicit clock.
    pub fn dismiss_at(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        match self.records.remove(id) {
            Some(_) => {
                self.tombstones.insert(id.to_string(), now);
                true
            }
            None => false,
        }
    }

    /// Active notifications, newest first; ties broken by priority rank.
    pub fn active(&self) -> Vec<Notification> {
        let mut list: Vec<Notification> = self.records.values().cloned().collect();
        list.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.priority.rank().cmp(&a.priority.rank()))
                .then_with(|| a.id.cmp(&b.id))
        });
        list
    }

    /// Fresh recount over the active set.
    pub fn summary(&self) -> NotificationSummary {
        NotificationSummary::recount(self.records.values())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_tombstoned(&self, id: &str) -> bool {
        self.tombstones.contains_key(id)
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}
