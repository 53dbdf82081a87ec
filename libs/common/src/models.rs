//! Wire models for the remote video service
//!
//! These types mirror the JSON envelope returned by the remote service for
//! both uploads and status lookups. They carry no business logic beyond a
//! handful of predicates used to decide whether polling should continue.
//!
//! Every struct keeps the fields it does not know about in a flattened
//! `extra` map, and every optional field is skipped on serialization when it
//! was absent on input. Decoding and re-encoding an envelope therefore gives
//! back the same JSON value the remote service sent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields not modelled explicitly, preserved as-is
pub type ExtraFields = Map<String, Value>;

/// Uniform success/result/errors wrapper returned by the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The video record, `null` when the call failed
    pub result: Option<UploadResult>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Envelope {
    /// Remote errors, or an empty slice when none were reported
    pub fn errors(&self) -> &[Value] {
        self.errors.as_deref().unwrap_or_default()
    }
}

/// Snapshot of a single video as known by the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    /// Opaque identifier assigned by the remote service
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    pub status: VideoStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_to_stream: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playback: Option<Playback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ExtraFields>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl UploadResult {
    pub fn is_ready(&self) -> bool {
        self.ready_to_stream.unwrap_or(false)
    }

    /// No further state change is expected once ready or failed
    pub fn is_terminal(&self) -> bool {
        self.is_ready() || self.status.is_failed()
    }

    /// Name the remote service recorded for the upload, usually the filename
    pub fn name(&self) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|meta| meta.get("name"))
            .and_then(Value::as_str)
    }
}

/// Processing state of a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatus {
    /// State label, owned by the remote service and not a closed set
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pct_complete: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason_text: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl VideoStatus {
    /// Create a status with only a state label
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            pct_complete: None,
            error_reason_code: None,
            error_reason_text: None,
            extra: ExtraFields::new(),
        }
    }

    /// Failed if the label says so or an error code was attached
    pub fn is_failed(&self) -> bool {
        matches!(self.state.as_str(), "failed" | "error")
            || self
                .error_reason_code
                .as_deref()
                .is_some_and(|code| !code.is_empty())
    }

    /// Human-readable failure reason, preferring the text over the code
    pub fn failure_reason(&self) -> Option<&str> {
        non_empty(self.error_reason_text.as_deref())
            .or_else(|| non_empty(self.error_reason_code.as_deref()))
    }

    /// Completion percentage, which the remote service sends as a string
    pub fn progress(&self) -> Option<f64> {
        match self.pct_complete.as_ref()? {
            Value::String(pct) => pct.trim().parse().ok(),
            Value::Number(pct) => pct.as_f64(),
            _ => None,
        }
    }
}

/// Streaming URLs, one per protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hls: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
