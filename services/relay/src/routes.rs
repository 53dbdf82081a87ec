//! Relay service routes

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartRejection},
    http::{
        Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
    },
    response::IntoResponse,
    routing::{get, post},
};
use common::error::SettingsResult;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    error::{RelayError, RelayResult},
    settings::RelaySettings,
    state::AppState,
    stream_client::VideoUpload,
};

/// Multipart field the client sends the file under
const VIDEO_FIELD: &str = "video";

/// Create the router for the relay service
///
/// The request body limit is disabled, size limits are left to the remote
/// service.
pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/upload", post(upload_video))
        .route("/api/video/:uid", get(video_status))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Build the CORS layer for the configured client origin
pub fn build_cors_layer(settings: &RelaySettings) -> SettingsResult<CorsLayer> {
    Ok(CorsLayer::new()
        .allow_origin(settings.origin()?)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([ORIGIN, CONTENT_TYPE, ACCEPT, AUTHORIZATION]))
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "stream-relay"
    }))
}

/// Forward a multipart video upload to the remote service
pub async fn upload_video(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> RelayResult<impl IntoResponse> {
    let mut multipart = multipart.map_err(|e| RelayError::MissingFile(e.to_string()))?;
    let upload = read_video_field(&mut multipart).await?;

    info!(
        "Received file: {}, size: {}",
        upload.file_name,
        upload.data.len()
    );

    let envelope = state.stream_client.upload(upload).await?;
    Ok(Json(envelope))
}

/// Relay a status lookup for a single video
///
/// The remote HTTP status code is passed through with the envelope, so an
/// unknown identifier answers 404 rather than 200.
pub async fn video_status(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> RelayResult<impl IntoResponse> {
    let (status, envelope) = state.stream_client.video_status(&uid).await?;
    Ok((status, Json(envelope)))
}

async fn read_video_field(multipart: &mut Multipart) -> RelayResult<VideoUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RelayError::MissingFile(e.to_string()))?
    {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| RelayError::MissingFile("field 'video' is not a file".to_string()))?;
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| RelayError::FileRead(e.to_string()))?;

        return Ok(VideoUpload {
            file_name,
            content_type,
            data,
        });
    }

    Err(RelayError::MissingFile(
        "request has no 'video' field".to_string(),
    ))
}
