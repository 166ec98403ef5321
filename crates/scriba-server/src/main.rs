//! HTTP upload server: accepts article files, runs the processing pipeline,
//! and stores the indexed results.

mod config;
mod error;
mod handlers;

use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tracing_subscriber::EnvFilter;

use crate::config::{ServerConfig, MAX_UPLOAD_BYTES};
use crate::handlers::AppState;
use scriba_pipeline::Orchestrator;

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/process_article", post(handlers::process_article))
        .route("/articles", get(handlers::list_articles))
        .route("/articles/:id", get(handlers::get_article))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();

    let orchestrator = Orchestrator::from_env()
        .context("No completion-service credentials; set GIGACHAT_AUTH_KEY or OPENAI_API_KEY")?;

    std::fs::create_dir_all(&config.uploads_dir)
        .with_context(|| format!("Failed to create {}", config.uploads_dir.display()))?;

    let db = scriba_store::init_db(&config.db_path)
        .await
        .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?;

    let state = AppState {
        db,
        orchestrator: Arc::new(orchestrator),
        uploads_dir: config.uploads_dir.clone(),
    };

    let app = build_router(state);

    tracing::info!(addr = %config.addr, uploads = %config.uploads_dir.display(), "Server starting");
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
