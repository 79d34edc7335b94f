// Web-based image analyzer using Azure AI Vision
//
// Configuration comes from the environment (or a .env file):
//   AI_SERVICE_ENDPOINT, AI_SERVICE_KEY        required
//   AI_SERVICE_TIMEOUT_SECS, AI_SERVICE_LANGUAGE,
//   AI_SERVICE_GENDER_NEUTRAL_CAPTION, BIND_ADDR,
//   UPLOAD_DIR, MAX_UPLOAD_BYTES, ANNOTATION_CLAMP_BOXES

use std::sync::Arc;

use ai_image_analyzer::{
    config::AppConfig,
    ingest::{UploadSlot, DEFAULT_SLOT_NAME},
    server::{self, AppState},
    VisionClient,
};
use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let client = VisionClient::new(config.client.clone())?;

    let mut state = AppState::new(client, UploadSlot::in_dir(&config.upload_dir, DEFAULT_SLOT_NAME));
    state.render = config.render;
    state.max_upload_bytes = config.max_upload_bytes;

    let app = server::router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!("🚀 Server running on http://{}", config.bind_addr);
    info!("📸 Open in your browser to start analyzing!");

    axum::serve(listener, app).await?;
    Ok(())
}
