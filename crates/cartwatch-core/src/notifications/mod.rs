//! Notification feed: records, local store, async facade, poller.

pub mod center;
pub mod model;
pub mod poller;
pub mod store;

pub use center::NotificationCenter;
pub use model::{Notification, NotificationSummary, NotificationType, Priority};
pub use poller::{NotificationPoller, PollerConfig};
pub use store::NotificationStore;
