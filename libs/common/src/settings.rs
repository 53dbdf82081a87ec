//! Remote video service settings
//!
//! Credentials and endpoint for the remote service, read from `CLOUDFLARE_*`
//! environment variables.

use std::time::Duration;

use config::{Config, Environment};
use serde::Deserialize;
use tracing::info;

use crate::{
    error::{SettingsError, SettingsResult},
    path::path_segment,
};

/// Default API root of the remote service
pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Connection settings for the remote video service
#[derive(Debug, Clone, Deserialize)]
pub struct StreamSettings {
    /// Account identifier, embedded in every request path
    pub account_id: String,
    /// API credential sent as a bearer token
    pub api_token: String,
    /// API root, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Upper bound on a single outbound call, uploads included
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

impl StreamSettings {
    /// Load settings from environment variables
    ///
    /// # Environment Variables
    /// - `CLOUDFLARE_ACCOUNT_ID`: account identifier (required)
    /// - `CLOUDFLARE_API_TOKEN`: API token (required)
    /// - `CLOUDFLARE_BASE_URL`: API root (default: `DEFAULT_BASE_URL`)
    /// - `CLOUDFLARE_TIMEOUT_SECS`: outbound timeout (default: 300)
    pub fn from_env() -> SettingsResult<Self> {
        Self::from_source(Environment::with_prefix("CLOUDFLARE"))
    }

    /// Load settings from an explicit environment source
    pub fn from_source(source: Environment) -> SettingsResult<Self> {
        let settings: Self = Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;

        let settings = settings.validated()?;
        info!(
            "Remote video service configured at {} for account {}",
            settings.base_url, settings.account_id
        );
        Ok(settings)
    }

    fn validated(mut self) -> SettingsResult<Self> {
        if self.account_id.trim().is_empty() {
            return Err(SettingsError::Invalid("account_id is empty".to_string()));
        }
        if self.api_token.trim().is_empty() {
            return Err(SettingsError::Invalid("api_token is empty".to_string()));
        }

        self.base_url = self.base_url.trim_end_matches('/').to_string();
        if self.base_url.is_empty() {
            return Err(SettingsError::Invalid("base_url is empty".to_string()));
        }

        Ok(self)
    }

    /// Collection endpoint, used for uploads
    pub fn stream_url(&self) -> String {
        format!("{}/accounts/{}/stream", self.base_url, self.account_id)
    }

    /// Per-video endpoint, used for status lookups
    ///
    /// `uid` always lands in a single path segment below the collection.
    /// Returns `None` for identifiers that cannot be expressed that way.
    pub fn video_url(&self, uid: &str) -> Option<String> {
        let segment = path_segment(uid)?;
        Some(format!("{}/{}", self.stream_url(), segment))
    }

    /// Value of the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.api_token)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
