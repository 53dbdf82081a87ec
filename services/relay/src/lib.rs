//! HTTP relay between browser clients and the remote video service
//!
//! The relay is stateless: every request maps to exactly one outbound call
//! whose response is forwarded back, reshaped only where an error needs
//! diagnostic context.

pub mod error;
pub mod routes;
pub mod settings;
pub mod state;
pub mod stream_client;

pub use routes::{build_cors_layer, create_router};
pub use state::AppState;
