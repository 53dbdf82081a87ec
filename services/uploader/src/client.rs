//! HTTP client for the relay endpoints

use std::path::Path;

use async_trait::async_trait;
use common::{Envelope, UploadResult, path::path_segment};
use reqwest::{
    Client, Response,
    multipart::{Form, Part},
};
use serde::Deserialize;
use tracing::debug;

use crate::error::ClientError;

/// Multipart field the relay reads the file from
const VIDEO_FIELD: &str = "video";

/// A video selected for upload
#[derive(Debug, Clone)]
pub struct VideoFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl VideoFile {
    /// Read a file from disk, guessing the content type from its extension
    /// when none is given
    pub async fn from_path(
        path: &Path,
        content_type: Option<String>,
    ) -> Result<Self, ClientError> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("video")
            .to_string();
        let content_type =
            content_type.or_else(|| guess_content_type(path).map(str::to_string));

        Ok(Self {
            file_name,
            content_type,
            data,
        })
    }
}

fn guess_content_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "mp4" | "m4v" => Some("video/mp4"),
        "mov" => Some("video/quicktime"),
        "webm" => Some("video/webm"),
        "mkv" => Some("video/x-matroska"),
        "avi" => Some("video/x-msvideo"),
        "mpg" | "mpeg" => Some("video/mpeg"),
        _ => None,
    }
}

/// The two calls the upload workflow needs
#[async_trait]
pub trait VideoApi: Send + Sync {
    /// Upload a file and return the initial video record
    async fn upload(&self, file: VideoFile) -> Result<UploadResult, ClientError>;

    /// Fetch a fresh video record for an identifier
    async fn status(&self, uid: &str) -> Result<UploadResult, ClientError>;
}

/// Error body produced by the relay
#[derive(Debug, Deserialize)]
struct RelayErrorBody {
    error: String,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

impl RelayErrorBody {
    fn message(self) -> String {
        match self.details {
            Some(serde_json::Value::String(details)) if !details.is_empty() => {
                format!("{}: {}", self.error, details)
            }
            Some(serde_json::Value::Null) | Some(serde_json::Value::String(_)) | None => self.error,
            Some(details) => format!("{}: {}", self.error, details),
        }
    }
}

/// Relay client backed by reqwest
#[derive(Clone)]
pub struct RelayClient {
    http: Client,
    base_url: String,
}

impl RelayClient {
    /// Create a new client for the relay at `base_url`
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl VideoApi for RelayClient {
    async fn upload(&self, file: VideoFile) -> Result<UploadResult, ClientError> {
        debug!("Uploading {} ({} bytes)", file.file_name, file.data.len());

        let part = Part::bytes(file.data).file_name(file.file_name);
        let part = match file.content_type.as_deref() {
            Some(content_type) => part.mime_str(content_type)?,
            None => part,
        };
        let form = Form::new().part(VIDEO_FIELD, part);

        let response = self
            .http
            .post(self.url("/api/upload"))
            .multipart(form)
            .send()
            .await?;

        into_result(response).await
    }

    async fn status(&self, uid: &str) -> Result<UploadResult, ClientError> {
        let segment =
            path_segment(uid).ok_or_else(|| ClientError::InvalidVideoId(uid.to_string()))?;
        let response = self
            .http
            .get(self.url(&format!("/api/video/{}", segment)))
            .send()
            .await?;

        into_result(response).await
    }
}

/// Decode a relay response into the video record it carries
///
/// The status endpoint may forward an envelope with a non-2xx status, so an
/// envelope is tried first whatever the status code.
async fn into_result(response: Response) -> Result<UploadResult, ClientError> {
    let status = response.status();
    let body = response.bytes().await?;

    match serde_json::from_slice::<Envelope>(&body) {
        Ok(Envelope {
            result: Some(result),
            success: true,
            ..
        }) => Ok(result),
        Ok(envelope) => Err(ClientError::Rejected(envelope.errors().to_vec())),
        Err(source) => match serde_json::from_slice::<RelayErrorBody>(&body) {
            Ok(error) => Err(ClientError::Relay {
                status,
                message: error.message(),
            }),
            Err(_) => Err(ClientError::Decode { status, source }),
        },
    }
}
