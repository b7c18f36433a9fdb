//! # Cartwatch Core Library
//!
//! Core business logic for Cartwatch: the alerting and guarded-mutation
//! subsystem of a grocery-management dashboard. All operations are
//! available to any host through this library; the CLI binary is a thin
//! layer over it, and a GUI can mount the same components.
//!
//! ## Architecture
//!
//! - **Notification store**: local working set reconciled against server
//!   snapshots, with dismissal tombstones and sticky read state
//! - **Poller**: interval-driven refresh with a generation guard against
//!   stale in-flight fetches
//! - **Preferences**: typed preference tree, quiet-hours evaluation,
//!   draft-until-saved updates
//! - **Repurchase guard**: check-then-confirm gate in front of
//!   shopping-list adds
//! - **Remote**: trait seams for the dashboard collaborators plus the
//!   reqwest-backed implementation
//!
//! ## Key Components
//!
//! - [`NotificationStore`] / [`NotificationCenter`] / [`NotificationPoller`]
//! - [`NotificationPreferences`] / [`PreferencesStore`]
//! - [`RepurchaseGuard`]
//! - [`HttpApi`]

pub mod config;
pub mod error;
pub mod guard;
pub mod notifications;
pub mod preferences;
pub mod remote;

pub use config::Config;
pub use error::{ConfigError, CoreError, Result, SourceError, ValidationError};
pub use guard::{AddOutcome, CandidateItem, GuardState, PendingWarning, RepurchaseGuard};
pub use notifications::{
    Notification, NotificationCenter, NotificationPoller, NotificationStore, NotificationSummary,
    NotificationType, PollerConfig, Priority,
};
pub use preferences::{NotificationPreferences, PreferencesStore, QuietHours};
pub use remote::{
    HttpApi, NotificationSource, PreferencesSource, PurchaseHistorySource, RepurchaseCheckResult,
    ShoppingListSink,
};
