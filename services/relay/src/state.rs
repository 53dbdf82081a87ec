//! Application state shared across handlers

use crate::stream_client::StreamClient;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub stream_client: StreamClient,
}
