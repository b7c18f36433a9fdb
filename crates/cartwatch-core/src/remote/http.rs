//! Reqwest-backed implementation of the collaborator traits.
//!
//! Talks to the grocery dashboard backend under its `/api` prefix. Every
//! endpoint wraps its payload in a `{"status": "success", ...}` envelope;
//! a 200 response whose envelope reports anything else is treated the
//! same as an HTTP failure.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::error::{ConfigError, SourceError};
use crate::guard::CandidateItem;
use crate::notifications::{Notification, NotificationSummary};
use crate::preferences::NotificationPreferences;
use crate::remote::traits::{
    NotificationSource, PreferencesSource, PurchaseHistorySource, RepurchaseCheckResult,
    ShoppingListSink,
};

/// HTTP client for the dashboard API, implementing all four collaborator
/// seams against one base URL.
#[derive(Debug, Clone)]
pub struct HttpApi {
    base: String,
    client: Client,
}

impl HttpApi {
    /// Build a client for `base_url` (e.g. `http://127.0.0.1:5000/api`).
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(base_url).map_err(|err| ConfigError::InvalidValue {
            key: "api.base_url".to_string(),
            message: err.to_string(),
        })?;
        Ok(Self {
            base: parsed.as_str().trim_end_matches('/').to_string(),
            client: Client::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let resp = self.client.get(format!("{}{path}", self.base)).send().await?;
        decode(resp).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, SourceError> {
        let mut req = self.client.post(format!("{}{path}", self.base));
        if let Some(body) = body {
            req = req.json(body);
        }
        decode(req.send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, SourceError> {
    let status = resp.status();
    if status.as_u16() == 404 {
        return Err(SourceError::NotFound);
    }
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(SourceError::Status {
            status: status.as_u16(),
            message,
        });
    }
    resp.json::<T>()
        .await
        .map_err(|err| SourceError::Decode(err.to_string()))
}

fn expect_success(status: &str) -> Result<(), SourceError> {
    if status == "success" {
        Ok(())
    } else {
        Err(SourceError::Server(status.to_string()))
    }
}

// Wire envelopes, shaped after the dashboard backend's responses.

#[derive(Deserialize)]
struct StatusEnvelope {
    status: String,
}

#[derive(Deserialize)]
struct NotificationsEnvelope {
    status: String,
    #[serde(default)]
    notifications: Vec<Notification>,
}

#[derive(Deserialize)]
struct SummaryEnvelope {
    status: String,
    summary: NotificationSummary,
}

#[derive(Deserialize)]
struct PreferencesEnvelope {
    status: String,
    preferences: NotificationPreferences,
}

#[derive(Deserialize)]
struct RecencyEnvelope {
    status: String,
    #[serde(flatten)]
    result: RepurchaseCheckResult,
}

#[async_trait]
impl NotificationSource for HttpApi {
    async fn fetch_notifications(&self) -> Result<Vec<Notification>, SourceError> {
        let env: NotificationsEnvelope = self.get_json("/notifications").await?;
        expect_success(&env.status)?;
        Ok(env.notifications)
    }

    async fn fetch_summary(&self) -> Result<NotificationSummary, SourceError> {
        let env: SummaryEnvelope = self.get_json("/notifications/summary").await?;
        expect_success(&env.status)?;
        Ok(env.summary)
    }

    async fn acknowledge(&self, id: &str) -> Result<(), SourceError> {
        let path = format!("/notifications/{}/read", urlencoding::encode(id));
        let env: StatusEnvelope = self.post_json(&path, None).await?;
        expect_success(&env.status)
    }

    async fn dismiss_remote(&self, id: &str) -> Result<(), SourceError> {
        let path = format!("/notifications/{}/dismiss", urlencoding::encode(id));
        let env: StatusEnvelope = self.post_json(&path, None).await?;
        expect_success(&env.status)
    }
}

#[async_trait]
impl PreferencesSource for HttpApi {
    async fn load_preferences(&self) -> Result<NotificationPreferences, SourceError> {
        let env: PreferencesEnvelope = self.get_json("/notifications/preferences").await?;
        expect_success(&env.status)?;
        Ok(env.preferences)
    }

    async fn save_preferences(&self, prefs: &NotificationPreferences) -> Result<(), SourceError> {
        let body = serde_json::to_value(prefs)
            .map_err(|err| SourceError::Decode(err.to_string()))?;
        let env: StatusEnvelope = self
            .post_json("/notifications/preferences", Some(&body))
            .await?;
        expect_success(&env.status)
    }
}

#[async_trait]
impl PurchaseHistorySource for HttpApi {
    async fn check_recent(&self, item_name: &str) -> Result<RepurchaseCheckResult, SourceError> {
        let path = format!(
            "/purchase-history/recency?item={}",
            urlencoding::encode(item_name)
        );
        let env: RecencyEnvelope = self.get_json(&path).await?;
        expect_success(&env.status)?;
        Ok(env.result)
    }
}

#[async_trait]
impl ShoppingListSink for HttpApi {
    async fn add_item(&self, item: &CandidateItem) -> Result<(), SourceError> {
        let body = serde_json::to_value(item)
            .map_err(|err| SourceError::Decode(err.to_string()))?;
        let resp = self
            .client
            .post(format!("{}/shopping-list/items", self.base))
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}
