//! Client for the remote video service
//!
//! Each method issues exactly one authenticated request and never retries.

use axum::body::Bytes;
use common::{Envelope, settings::StreamSettings};
use reqwest::{
    Client, Response, StatusCode,
    header::AUTHORIZATION,
    multipart::{Form, Part},
};
use tracing::{debug, info};

use crate::error::{RelayError, RelayResult};

/// Field name the remote service expects the file under
const REMOTE_FILE_FIELD: &str = "file";

/// A file received from the client, ready to be forwarded
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl VideoUpload {
    fn into_part(self) -> Part {
        let length = self.data.len() as u64;
        let part = || {
            Part::stream_with_length(self.data.clone(), length).file_name(self.file_name.clone())
        };

        // An unparsable content type is dropped, the upload still goes through
        match self.content_type.as_deref() {
            Some(content_type) => part().mime_str(content_type).unwrap_or_else(|_| part()),
            None => part(),
        }
    }
}

/// Remote video service client
#[derive(Clone)]
pub struct StreamClient {
    http: Client,
    settings: StreamSettings,
}

impl StreamClient {
    /// Create a new client with the configured timeout
    pub fn new(settings: StreamSettings) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self { http, settings })
    }

    /// Forward an upload and return the remote envelope
    ///
    /// Fails with `RelayError::Rejected` when the remote service reports
    /// `success: false`.
    pub async fn upload(&self, upload: VideoUpload) -> RelayResult<Envelope> {
        let url = self.settings.stream_url();
        info!("Forwarding {} to {}", upload.file_name, url);

        let form = Form::new().part(REMOTE_FILE_FIELD, upload.into_part());
        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.settings.bearer())
            .multipart(form)
            .send()
            .await
            .map_err(|e| RelayError::transport("Failed to upload to Cloudflare", e))?;

        let (status, body) = read_body(response).await?;
        info!("Remote upload responded with {}", status);
        debug!("Remote upload body: {}", body);

        let envelope = parse_envelope(body.clone())?;
        if !envelope.success {
            return Err(RelayError::Rejected {
                errors: envelope.errors().to_vec(),
                body,
            });
        }

        Ok(envelope)
    }

    /// Fetch the current status of a video
    ///
    /// The remote status code is returned alongside the envelope so the
    /// caller can forward it unchanged. `uid` is encoded as a single path
    /// segment and never reaches another remote endpoint.
    pub async fn video_status(&self, uid: &str) -> RelayResult<(StatusCode, Envelope)> {
        let url = self
            .settings
            .video_url(uid)
            .ok_or_else(|| RelayError::InvalidVideoId(uid.to_string()))?;
        debug!("Fetching video status from {}", url);

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, self.settings.bearer())
            .send()
            .await
            .map_err(|e| RelayError::transport("Failed to get video status", e))?;

        let (status, body) = read_body(response).await?;
        debug!("Remote status for {} responded with {}: {}", uid, status, body);

        let envelope = parse_envelope(body)?;
        Ok((status, envelope))
    }
}

async fn read_body(response: Response) -> RelayResult<(StatusCode, String)> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| RelayError::transport("Could not read response", e))?;
    Ok((status, body))
}

fn parse_envelope(body: String) -> RelayResult<Envelope> {
    match serde_json::from_str(&body) {
        Ok(envelope) => Ok(envelope),
        Err(source) => Err(RelayError::Parse { source, body }),
    }
}
