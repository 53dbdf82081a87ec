//! Uploader CLI: sends a video through the relay and reports its processing.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use uploader::{Phase, RelayClient, UploadController, VideoFile};

#[derive(Parser)]
#[command(
    name = "uploader",
    about = "Upload a video through the stream relay and follow its processing"
)]
struct Cli {
    /// Path to the video file
    file: PathBuf,
    /// Base URL of the relay
    #[arg(long, env = "RELAY_URL", default_value = "http://localhost:3000")]
    relay_url: String,
    /// Seconds between two status checks
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    interval_secs: u64,
    /// Content type sent with the file, guessed from the extension if omitted
    #[arg(long)]
    content_type: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let file = VideoFile::from_path(&cli.file, cli.content_type)
        .await
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;

    let api = Arc::new(RelayClient::new(&cli.relay_url)?);
    let mut controller =
        UploadController::new(api).with_interval(Duration::from_secs(cli.interval_secs));
    let mut updates = controller.subscribe();

    info!("Sending {} to {}", file.file_name, cli.relay_url);
    println!("Uploading {}...", file.file_name);
    controller.start_upload(Some(file)).await;

    let mut last_message = None;
    let snapshot = loop {
        let snapshot = updates.borrow_and_update().clone();
        let message = snapshot.message();
        if message.is_some() && message != last_message {
            println!("{}", message.as_deref().unwrap_or_default());
            last_message = message;
        }

        if snapshot.phase.is_settled() {
            break snapshot;
        }
        updates.changed().await?;
    };

    match snapshot.phase {
        Phase::Ready => {
            if let Some(result) = &snapshot.result {
                println!("Video id: {}", result.uid);
                if let Some(preview) = &result.preview {
                    println!("Preview: {}", preview);
                }
                if let Some(playback) = &result.playback {
                    if let Some(hls) = &playback.hls {
                        println!("HLS: {}", hls);
                    }
                    if let Some(dash) = &playback.dash {
                        println!("DASH: {}", dash);
                    }
                }
            }
            Ok(())
        }
        Phase::Failed => bail!("Video processing failed"),
        Phase::Interrupted => bail!("Lost contact with the relay while checking the status"),
        _ => bail!(
            "{}",
            snapshot
                .error
                .unwrap_or_else(|| "Upload did not complete".to_string())
        ),
    }
}
