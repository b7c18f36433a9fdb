//! Collaborator seams and the HTTP implementation.

pub mod http;
pub mod traits;

pub use http::HttpApi;
pub use traits::{
    NotificationSource, PreferencesSource, PurchaseHistorySource, RepurchaseCheckResult,
    ShoppingListSink,
};
