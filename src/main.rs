//! receipted — receipt ingestion service.
//!
//! Accepts authenticated receipt photo uploads, stores them durably,
//! extracts structured data through an external vision model, and serves
//! owner-scoped receipt records over HTTP.

mod api;
mod config;
mod db;
mod models;
mod pipeline;

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use api::router::app_router;
use api::types::ApiContext;
use config::Config;
use pipeline::extraction::client::OpenAiVisionClient;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "server failed to start");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    std::fs::create_dir_all(&config.data_dir)?;
    std::fs::create_dir_all(config.object_root())?;

    let conn = db::sqlite::open_database(&config.db_path())?;
    tracing::info!(path = %config.db_path().display(), "database ready");

    let vision = Arc::new(OpenAiVisionClient::new(&config.vision)?);
    let bind_addr = config.bind_addr;
    let ctx = ApiContext::new(config, conn, vision);
    let app = app_router(ctx);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, version = config::APP_VERSION, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
