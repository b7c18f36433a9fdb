//! Notification records and the derived summary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a notification, as reported by the server.
///
/// Unknown categories decode as [`NotificationType::Other`] so a new
/// server-side type cannot break snapshot ingestion.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    ExpirationAlert,
    BudgetWarning,
    ShoppingReminder,
    MealPrepReminder,
    #[serde(other)]
    Other,
}

impl NotificationType {
    pub const ALL: [NotificationType; 5] = [
        NotificationType::ExpirationAlert,
        NotificationType::BudgetWarning,
        NotificationType::ShoppingReminder,
        NotificationType::MealPrepReminder,
        NotificationType::Other,
    ];
}

/// Notification priority. The derived order ranks `Low` lowest and
/// `Urgent` highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    /// Numeric rank used for tie-breaking in feed order (urgent sorts first).
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
            Priority::Urgent => 3,
        }
    }
}

/// A single notification record.
///
/// Created remotely; this subsystem only transitions `read` and `dismissed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Server-assigned opaque id, unique within the feed.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    /// Opaque server payload (expiring items, budget figures, ...).
    #[serde(rename = "data", default)]
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub dismissed: bool,
}

/// Aggregate counts over the active (non-dismissed) working set.
///
/// Always a derived view: recomputed after every mutation or poll, never
/// mutated independently. All priority and type buckets are present even
/// when zero, matching the server's summary payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSummary {
    pub total_active: u32,
    pub by_priority: BTreeMap<Priority, u32>,
    pub by_type: BTreeMap<NotificationType, u32>,
}

impl NotificationSummary {
    /// Recount from an active working set.
    pub fn recount<'a, I>(active: I) -> Self
    where
        I: IntoIterator<Item = &'a Notification>,
    {
        let mut by_priority: BTreeMap<Priority, u32> =
            Priority::ALL.iter().map(|p| (*p, 0)).collect();
        let mut by_type: BTreeMap<NotificationType, u32> =
            NotificationType::ALL.iter().map(|t| (*t, 0)).collect();
        let mut total_active = 0;

        for n in active {
            total_active += 1;
            *by_priority.entry(n.priority).or_insert(0) += 1;
            *by_type.entry(n.kind).or_insert(0) += 1;
        }

        Self {
            total_active,
            by_priority,
            by_type,
        }
    }

    /// Count for one priority bucket.
    pub fn priority_count(&self, priority: Priority) -> u32 {
        self.by_priority.get(&priority).copied().unwrap_or(0)
    }

    /// Count for one type bucket.
    pub fn type_count(&self, kind: NotificationType) -> u32 {
        self.by_type.get(&kind).copied().unwrap_or(0)
    }
}

impl Default for NotificationSummary {
    fn default() -> Self {
        Self::recount(std::iter::empty())
    }
}
