//! Custom error types for the relay service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;

/// Custom error type for the relay service
///
/// Each variant carries enough context for the caller to diagnose the
/// failure without access to the relay's logs.
#[derive(Error, Debug)]
pub enum RelayError {
    /// The upload did not contain a usable `video` file field
    #[error("No video file provided: {0}")]
    MissingFile(String),

    /// The video identifier cannot be addressed below the collection
    #[error("Invalid video identifier: {0:?}")]
    InvalidVideoId(String),

    /// The uploaded file could not be read from the request
    #[error("Could not open file: {0}")]
    FileRead(String),

    /// The remote service could not be reached or its body not read
    #[error("{context}: {source}")]
    Transport {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The remote service answered with something other than an envelope
    #[error("Could not parse response: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    /// The remote service reported the upload as unsuccessful
    #[error("Upload failed")]
    Rejected { errors: Vec<Value>, body: String },
}

impl RelayError {
    pub fn transport(context: &'static str, source: reqwest::Error) -> Self {
        RelayError::Transport { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingFile(_)
            | RelayError::InvalidVideoId(_)
            | RelayError::Rejected { .. } => StatusCode::BAD_REQUEST,
            RelayError::FileRead(_) | RelayError::Transport { .. } | RelayError::Parse { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        error!("Relay request failed with {}: {}", status, self);

        let body = match self {
            RelayError::MissingFile(details) => json!({
                "error": "No video file provided",
                "details": details,
            }),
            RelayError::InvalidVideoId(uid) => json!({
                "error": "Invalid video identifier",
                "details": uid,
            }),
            RelayError::FileRead(details) => json!({
                "error": "Could not open file",
                "details": details,
            }),
            RelayError::Transport { context, source } => json!({
                "error": context,
                "details": source.to_string(),
            }),
            RelayError::Parse { source, body } => json!({
                "error": "Could not parse response",
                "details": source.to_string(),
                "response": body,
            }),
            RelayError::Rejected { errors, body } => json!({
                "error": "Upload failed",
                "details": errors,
                "response": body,
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for relay results
pub type RelayResult<T> = Result<T, RelayError>;
