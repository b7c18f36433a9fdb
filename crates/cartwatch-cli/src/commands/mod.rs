pub mod cart;
pub mod completions;
pub mod config;
pub mod notifications;
pub mod prefs;

use std::sync::Arc;

use cartwatch_core::{Config, HttpApi};

/// Load the app config and build the shared API client.
pub(crate) fn api_client() -> Result<(Config, Arc<HttpApi>), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let api = Arc::new(HttpApi::new(&config.api.base_url)?);
    Ok((config, api))
}
