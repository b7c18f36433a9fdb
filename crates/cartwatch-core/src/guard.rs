//! Repurchase guard: two-phase check-then-confirm for shopping-list adds.
//!
//! An add request first consults purchase history. A purchase recent
//! enough to cross the warning threshold parks the add behind an explicit
//! user decision; anything else -- including an unavailable or empty
//! history source -- commits straight away. History problems never block
//! an add.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Checking -> (Clear | WarningPending)
//! WarningPending -> (Confirmed | Cancelled) -> Idle
//! ```
//!
//! At most one add is in flight: a request arriving during `Checking` or
//! `WarningPending` is rejected with [`CoreError::GuardBusy`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{CoreError, Result, SourceError};
use crate::remote::{PurchaseHistorySource, ShoppingListSink};

/// Days since last purchase below which an add triggers a warning.
pub const DEFAULT_WARN_THRESHOLD_DAYS: i64 = 30;

/// Bound on the history check; an overrun fails open.
pub const DEFAULT_CHECK_TIMEOUT_MS: u64 = 5_000;

fn default_quantity() -> u32 {
    1
}
fn default_unit() -> String {
    "pieces".to_string()
}

/// Candidate shopping-list item, exactly as it will be committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub name: String,
    pub category: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub is_organic: bool,
}

impl CandidateItem {
    pub fn new(name: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            quantity: default_quantity(),
            unit: default_unit(),
            price: 0.0,
            is_organic: false,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = unit.to_string();
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    pub fn organic(mut self, is_organic: bool) -> Self {
        self.is_organic = is_organic;
        self
    }
}

/// Ephemeral state for an add that tripped the recency warning.
///
/// Destroyed on confirm or cancel; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingWarning {
    pub item: CandidateItem,
    pub last_purchased: DateTime<Utc>,
    pub days_since: i64,
    /// User-facing prompt built from the recency data.
    pub message: String,
}

/// Where the guard currently is, for hosts that render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    Idle,
    Checking,
    WarningPending,
}

/// Outcome of an add request that was not rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    /// The add went through (no recent purchase, or history unavailable).
    Committed,
    /// The add is parked; confirm or cancel to resolve it.
    Warned(PendingWarning),
}

/// Gate between an "add item" intent and the shopping-list mutation.
pub struct RepurchaseGuard {
    history: Arc<dyn PurchaseHistorySource>,
    cart: Arc<dyn ShoppingListSink>,
    threshold_days: i64,
    check_timeout: Duration,
    checking: AtomicBool,
    pending: Mutex<Option<PendingWarning>>,
}

impl RepurchaseGuard {
    pub fn new(history: Arc<dyn PurchaseHistorySource>, cart: Arc<dyn ShoppingListSink>) -> Self {
        Self {
            history,
            cart,
            threshold_days: DEFAULT_WARN_THRESHOLD_DAYS,
            check_timeout: Duration::from_millis(DEFAULT_CHECK_TIMEOUT_MS),
            checking: AtomicBool::new(false),
            pending: Mutex::new(None),
        }
    }

    pub fn with_threshold_days(mut self, days: i64) -> Self {
        self.threshold_days = days;
        self
    }

    pub fn with_check_timeout(mut self, check_timeout: Duration) -> Self {
        self.check_timeout = check_timeout;
        self
    }

    pub fn state(&self) -> GuardState {
        if self.checking.load(Ordering::SeqCst) {
            GuardState::Checking
        } else if self.pending.lock().unwrap().is_some() {
            GuardState::WarningPending
        } else {
            GuardState::Idle
        }
    }

    /// The parked warning, if any.
    pub fn pending(&self) -> Option<PendingWarning> {
        self.pending.lock().unwrap().clone()
    }

    /// Gate an add-item intent.
    ///
    /// Returns [`AddOutcome::Committed`] when the item was added, or
    /// [`AddOutcome::Warned`] when the add is parked behind a user
    /// decision. Rejects with [`CoreError::GuardBusy`] while another add
    /// is mid-check or awaiting its decision.
    pub async fn request_add(&self, item: CandidateItem) -> Result<AddOutcome> {
        if self.pending.lock().unwrap().is_some() {
            return Err(CoreError::GuardBusy);
        }
        if self.checking.swap(true, Ordering::SeqCst) {
            return Err(CoreError::GuardBusy);
        }
        let result = self.check_and_route(item).await;
        self.checking.store(false, Ordering::SeqCst);
        result
    }

    async fn check_and_route(&self, item: CandidateItem) -> Result<AddOutcome> {
        let check = match timeout(self.check_timeout, self.history.check_recent(&item.name)).await
        {
            Ok(Ok(result)) => Some(result),
            Ok(Err(SourceError::NotFound)) => {
                debug!(item = %item.name, "no purchase history; add is clear");
                None
            }
            Ok(Err(err)) => {
                warn!(item = %item.name, error = %err, "history check failed; failing open");
                None
            }
            Err(_) => {
                warn!(
                    item = %item.name,
                    timeout_ms = self.check_timeout.as_millis() as u64,
                    "history check timed out; failing open"
                );
                None
            }
        };

        if let Some(check) = check {
            let days_since = (Utc::now() - check.last_purchased).num_days();
            if check.is_recent && days_since < self.threshold_days {
                let warning = PendingWarning {
                    message: warning_message(&item.name, days_since, check.frequency_days),
                    item,
                    last_purchased: check.last_purchased,
                    days_since,
                };
                debug!(
                    item = %warning.item.name,
                    days_since,
                    "recent repurchase detected; awaiting user decision"
                );
                *self.pending.lock().unwrap() = Some(warning.clone());
                return Ok(AddOutcome::Warned(warning));
            }
        }

        self.cart.add_item(&item).await?;
        Ok(AddOutcome::Committed)
    }

    /// Commit the parked candidate unchanged. The recency check is not
    /// repeated; the user has seen the warning and decided.
    ///
    /// The warning is destroyed before the commit is attempted, so a
    /// failed commit leaves the guard idle and the caller free to retry
    /// the add from scratch.
    pub async fn confirm(&self) -> Result<CandidateItem> {
        let warning = self
            .pending
            .lock()
            .unwrap()
            .take()
            .ok_or(CoreError::NoPendingWarning)?;
        self.cart.add_item(&warning.item).await?;
        debug!(item = %warning.item.name, "repurchase warning confirmed; item committed");
        Ok(warning.item)
    }

    /// Discard the parked candidate with no side effects.
    /// Returns the discarded item, or `None` when nothing was pending.
    pub fn cancel(&self) -> Option<CandidateItem> {
        let discarded = self.pending.lock().unwrap().take();
        if let Some(warning) = &discarded {
            debug!(item = %warning.item.name, "repurchase warning cancelled");
        }
        discarded.map(|warning| warning.item)
    }
}

fn warning_message(name: &str, days_since: i64, frequency_days: Option<f64>) -> String {
    match frequency_days {
        Some(freq) => format!(
            "You bought {name} {days_since} days ago and usually buy it every {freq:.0} days. Add it anyway?"
        ),
        None => format!("You bought {name} {days_since} days ago. Add it anyway?"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RepurchaseCheckResult;
    use async_trait::async_trait;

    enum HistoryBehavior {
        Recent { days_ago: i64, frequency: Option<f64> },
        Stale { days_ago: i64 },
        NotFound,
        Error,
        Hang,
    }

    struct FakeHistory {
        behavior: HistoryBehavior,
    }

    #[async_trait]
    impl PurchaseHistorySource for FakeHistory {
        async fn check_recent(&self, _item_name: &str) -> Result<RepurchaseCheckResult, SourceError> {
            match &self.behavior {
                HistoryBehavior::Recent { days_ago, frequency } => Ok(RepurchaseCheckResult {
                    is_recent: true,
                    last_purchased: Utc::now() - chrono::Duration::days(*days_ago),
                    frequency_days: *frequency,
                }),
                HistoryBehavior::Stale { days_ago } => Ok(RepurchaseCheckResult {
                    is_recent: false,
                    last_purchased: Utc::now() - chrono::Duration::days(*days_ago),
                    frequency_days: None,
                }),
                HistoryBehavior::NotFound => Err(SourceError::NotFound),
                HistoryBehavior::Error => Err(SourceError::Transport("down".to_string())),
                HistoryBehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Err(SourceError::NotFound)
                }
            }
        }
    }

    #[derive(Default)]
    struct FakeCart {
        added: Mutex<Vec<CandidateItem>>,
    }

    #[async_trait]
    impl ShoppingListSink for FakeCart {
        async fn add_item(&self, item: &CandidateItem) -> Result<(), SourceError> {
            self.added.lock().unwrap().push(item.clone());
            Ok(())
        }
    }

    fn guard_with(behavior: HistoryBehavior) -> (RepurchaseGuard, Arc<FakeCart>) {
        let cart = Arc::new(FakeCart::default());
        let guard = RepurchaseGuard::new(Arc::new(FakeHistory { behavior }), cart.clone());
        (guard, cart)
    }

    #[tokio::test]
    async fn recent_purchase_parks_the_add() {
        let (guard, cart) = guard_with(HistoryBehavior::Recent {
            days_ago: 5,
            frequency: None,
        });

        let outcome = guard.request_add(CandidateItem::new("milk", "dairy")).await.unwrap();
        let warning = match outcome {
            AddOutcome::Warned(w) => w,
            other => panic!("expected warning, got {other:?}"),
        };
        assert_eq!(warning.days_since, 5);
        assert!(warning.message.contains("5 days ago"));
        assert_eq!(guard.state(), GuardState::WarningPending);
        assert!(cart.added.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn old_purchase_commits_directly() {
        let (guard, cart) = guard_with(HistoryBehavior::Recent {
            days_ago: 45,
            frequency: None,
        });
        let outcome = guard.request_add(CandidateItem::new("milk", "dairy")).await.unwrap();
        assert_eq!(outcome, AddOutcome::Committed);
        assert_eq!(guard.state(), GuardState::Idle);
        assert_eq!(cart.added.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn non_recent_verdict_commits_directly() {
        let (guard, cart) = guard_with(HistoryBehavior::Stale { days_ago: 3 });
        let outcome = guard.request_add(CandidateItem::new("milk", "dairy")).await.unwrap();
        assert_eq!(outcome, AddOutcome::Committed);
        assert_eq!(cart.added.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_history_fails_open() {
        let (guard, cart) = guard_with(HistoryBehavior::NotFound);
        let outcome = guard.request_add(CandidateItem::new("durian", "fruit")).await.unwrap();
        assert_eq!(outcome, AddOutcome::Committed);
        assert_eq!(cart.added.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn history_error_fails_open() {
        let (guard, cart) = guard_with(HistoryBehavior::Error);
        let outcome = guard.request_add(CandidateItem::new("milk", "dairy")).await.unwrap();
        assert_eq!(outcome, AddOutcome::Committed);
        assert_eq!(cart.added.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn history_timeout_fails_open() {
        let cart = Arc::new(FakeCart::default());
        let guard = RepurchaseGuard::new(
            Arc::new(FakeHistory {
                behavior: HistoryBehavior::Hang,
            }),
            cart.clone(),
        )
        .with_check_timeout(Duration::from_millis(20));

        let outcome = guard.request_add(CandidateItem::new("milk", "dairy")).await.unwrap();
        assert_eq!(outcome, AddOutcome::Committed);
        assert_eq!(cart.added.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn confirm_commits_the_exact_candidate() {
        let (guard, cart) = guard_with(HistoryBehavior::Recent {
            days_ago: 2,
            frequency: Some(7.0),
        });

        let item = CandidateItem::new("eggs", "dairy")
            .with_quantity(12)
            .with_unit("carton")
            .with_price(4.99)
            .organic(true);
        let outcome = guard.request_add(item.clone()).await.unwrap();
        assert!(matches!(outcome, AddOutcome::Warned(_)));

        let committed = guard.confirm().await.unwrap();
        assert_eq!(committed, item);
        assert_eq!(cart.added.lock().unwrap().as_slice(), &[item]);
        assert_eq!(guard.state(), GuardState::Idle);
        assert!(guard.pending().is_none());
    }

    #[tokio::test]
    async fn cancel_discards_with_no_side_effects() {
        let (guard, cart) = guard_with(HistoryBehavior::Recent {
            days_ago: 2,
            frequency: None,
        });

        let item = CandidateItem::new("eggs", "dairy");
        guard.request_add(item.clone()).await.unwrap();
        assert_eq!(guard.cancel(), Some(item));
        assert!(cart.added.lock().unwrap().is_empty());
        assert_eq!(guard.state(), GuardState::Idle);
        // Cancelling again is a no-op.
        assert_eq!(guard.cancel(), None);
    }

    #[tokio::test]
    async fn second_add_while_pending_is_rejected() {
        let (guard, _cart) = guard_with(HistoryBehavior::Recent {
            days_ago: 2,
            frequency: None,
        });

        guard.request_add(CandidateItem::new("eggs", "dairy")).await.unwrap();
        let err = guard
            .request_add(CandidateItem::new("milk", "dairy"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::GuardBusy));

        // Resolving the first add frees the guard.
        guard.cancel();
        let outcome = guard.request_add(CandidateItem::new("bread", "bakery")).await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn confirm_without_pending_is_an_error() {
        let (guard, _cart) = guard_with(HistoryBehavior::NotFound);
        let err = guard.confirm().await.unwrap_err();
        assert!(matches!(err, CoreError::NoPendingWarning));
    }

    #[tokio::test]
    async fn warning_message_includes_frequency_when_known() {
        let (guard, _cart) = guard_with(HistoryBehavior::Recent {
            days_ago: 4,
            frequency: Some(7.4),
        });

        let outcome = guard.request_add(CandidateItem::new("milk", "dairy")).await.unwrap();
        match outcome {
            AddOutcome::Warned(warning) => {
                assert!(warning.message.contains("every 7 days"), "{}", warning.message);
            }
            other => panic!("expected warning, got {other:?}"),
        }
    }
}
