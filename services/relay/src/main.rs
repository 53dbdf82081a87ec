use anyhow::Result;
use common::settings::StreamSettings;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay::{
    AppState, build_cors_layer, create_router, settings::RelaySettings, stream_client::StreamClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting stream relay");

    let stream_settings = StreamSettings::from_env()?;
    let relay_settings = RelaySettings::from_env()?;

    let app_state = AppState {
        stream_client: StreamClient::new(stream_settings)?,
    };
    let cors = build_cors_layer(&relay_settings)?;
    let app = create_router(app_state, cors);

    let addr = relay_settings.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(
        "Stream relay listening on {}, accepting origin {}",
        addr, relay_settings.allowed_origin
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down stream relay");
        })
        .await?;

    Ok(())
}
