//! Human-readable rendering of video status labels

use crate::models::VideoStatus;

/// Render a status as a single display line
///
/// Known labels map to a fixed message. Anything else falls back to
/// `Status: <label>` so new labels introduced by the remote service never
/// break the display.
pub fn status_message(status: &VideoStatus) -> String {
    if status.is_failed() {
        let reason = status.failure_reason().unwrap_or("unknown error");
        return format!("Processing failed: {}", reason);
    }

    match status.state.as_str() {
        "pendingupload" => "Waiting for the upload to start...".to_string(),
        "downloading" => "Video is being downloaded...".to_string(),
        "queued" => "Video is queued for processing...".to_string(),
        "inprogress" | "processing" => match status.progress() {
            Some(pct) => format!("Video is being processed... ({:.0}%)", pct),
            None => "Video is being processed...".to_string(),
        },
        "ready" => "Video is ready to stream!".to_string(),
        other => format!("Status: {}", other),
    }
}
