//! Abstract contracts for the dashboard collaborators.
//!
//! The subsystem is transport-agnostic: anything that can produce
//! notification snapshots, persist preferences, answer recency checks,
//! and accept shopping-list mutations can host it. [`crate::remote::HttpApi`]
//! is the reqwest-backed implementation used by the CLI; tests substitute
//! in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::guard::CandidateItem;
use crate::notifications::{Notification, NotificationSummary};
use crate::preferences::NotificationPreferences;

/// Read-only snapshot of an item's purchase recency. Owned by the
/// purchase-history collaborator; never mutated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepurchaseCheckResult {
    pub is_recent: bool,
    pub last_purchased: DateTime<Utc>,
    /// Average days between purchases, when the history is deep enough.
    #[serde(default)]
    pub frequency_days: Option<f64>,
}

/// Remote notification feed.
#[async_trait]
pub trait NotificationSource: Send + Sync {
    /// Fetch the current server snapshot of active notifications.
    async fn fetch_notifications(&self) -> Result<Vec<Notification>, SourceError>;

    /// Fetch the server-computed summary.
    async fn fetch_summary(&self) -> Result<NotificationSummary, SourceError>;

    /// Persist a read acknowledgement.
    async fn acknowledge(&self, id: &str) -> Result<(), SourceError>;

    /// Persist a dismissal.
    async fn dismiss_remote(&self, id: &str) -> Result<(), SourceError>;
}

/// Remote store for the user's notification preferences.
#[async_trait]
pub trait PreferencesSource: Send + Sync {
    async fn load_preferences(&self) -> Result<NotificationPreferences, SourceError>;

    /// Persist a validated preference tree.
    async fn save_preferences(&self, prefs: &NotificationPreferences) -> Result<(), SourceError>;
}

/// Purchase-history lookups backing the repurchase guard.
#[async_trait]
pub trait PurchaseHistorySource: Send + Sync {
    /// Recency snapshot for an item, by name.
    ///
    /// Returns [`SourceError::NotFound`] for an item with no history;
    /// the guard treats that (and any other failure) as clear.
    async fn check_recent(&self, item_name: &str) -> Result<RepurchaseCheckResult, SourceError>;
}

/// Shopping-list mutation endpoint.
#[async_trait]
pub trait ShoppingListSink: Send + Sync {
    /// Commit an add. Invoked only by the guard's Clear and Confirmed
    /// transitions.
    async fn add_item(&self, item: &CandidateItem) -> Result<(), SourceError>;
}
