//! Relay server settings

use std::net::SocketAddr;

use axum::http::HeaderValue;
use common::error::{SettingsError, SettingsResult};
use config::{Config, Environment};
use serde::Deserialize;

/// Settings for the HTTP surface of the relay
#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
    /// Address the server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Browser origin allowed to call the relay
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_allowed_origin() -> String {
    "http://localhost:5173".to_string()
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            allowed_origin: default_allowed_origin(),
        }
    }
}

impl RelaySettings {
    /// Load settings from environment variables
    ///
    /// # Environment Variables
    /// - `RELAY_BIND_ADDR`: listen address (default: "0.0.0.0:3000")
    /// - `RELAY_ALLOWED_ORIGIN`: CORS origin (default: "http://localhost:5173")
    pub fn from_env() -> SettingsResult<Self> {
        Self::from_source(Environment::with_prefix("RELAY"))
    }

    /// Load settings from an explicit environment source
    pub fn from_source(source: Environment) -> SettingsResult<Self> {
        let settings: Self = Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;

        settings.socket_addr()?;
        settings.origin()?;
        Ok(settings)
    }

    pub fn socket_addr(&self) -> SettingsResult<SocketAddr> {
        self.bind_addr.parse().map_err(|e| {
            SettingsError::Invalid(format!("bind_addr '{}': {}", self.bind_addr, e))
        })
    }

    pub fn origin(&self) -> SettingsResult<HeaderValue> {
        self.allowed_origin.parse().map_err(|e| {
            SettingsError::Invalid(format!("allowed_origin '{}': {}", self.allowed_origin, e))
        })
    }
}
