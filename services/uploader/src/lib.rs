//! Client side of the stream relay
//!
//! Uploads a video through the relay and follows its processing by polling
//! the status endpoint until the remote service reports a terminal state.

pub mod client;
pub mod controller;
pub mod error;

pub use client::{RelayClient, VideoApi, VideoFile};
pub use controller::{MIN_POLL_INTERVAL, Phase, Snapshot, UploadController};
pub use error::ClientError;
