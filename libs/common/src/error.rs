//! Custom error types for the common library
//!
//! This module defines the configuration error shared by every service that
//! loads settings from the environment.

use config::ConfigError;
use thiserror::Error;

/// Error raised while loading or validating settings
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Settings could not be read or deserialized
    #[error("Configuration error: {0}")]
    Load(#[from] ConfigError),

    /// Settings were read but hold an unusable value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Type alias for Result with SettingsError
pub type SettingsResult<T> = Result<T, SettingsError>;
