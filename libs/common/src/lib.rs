//! Common library for the stream relay
//!
//! This crate provides the pieces shared by the relay server and the
//! uploader client: the remote service's envelope models, status rendering,
//! settings for the remote service and the related error types.
//!
//! ```rust,no_run
//! use common::settings::StreamSettings;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = StreamSettings::from_env()?;
//!     println!("Uploading to {}", settings.stream_url());
//!     Ok(())
//! }
//! ```

pub mod display;
pub mod error;
pub mod models;
pub mod path;
pub mod settings;

pub use models::{Envelope, Playback, UploadResult, VideoStatus};
