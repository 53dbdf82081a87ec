//! Custom error types for the uploader

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Error raised while talking to the relay
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request could not be built, sent or read back
    #[error("Request to the relay failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The relay answered with its own error payload
    #[error("{message} (HTTP {status})")]
    Relay { status: StatusCode, message: String },

    /// The relay forwarded an envelope flagged as unsuccessful
    #[error("Remote service reported failure: {}", describe_errors(.0))]
    Rejected(Vec<Value>),

    /// The relay answered with something that is neither an envelope nor an error
    #[error("Unexpected response from relay (HTTP {status}): {source}")]
    Decode {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },

    /// The identifier cannot be sent as a single path segment
    #[error("Invalid video identifier: {0:?}")]
    InvalidVideoId(String),

    /// The local file could not be read
    #[error("Could not read file: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_errors(errors: &[Value]) -> String {
    if errors.is_empty() {
        return "no details".to_string();
    }

    errors
        .iter()
        .map(|error| match error.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => error.to_string(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}
