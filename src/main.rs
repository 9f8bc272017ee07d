// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod error;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::application::engine::Engine;
use crate::infrastructure::config::load_engine_config;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    clear, data, domain, health_check, metrics, pan, reconnect, reset_view, status,
    toggle_follow, toggle_playback, toggle_series, zoom,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = load_engine_config()?;
    let addr: SocketAddr = config.listen_addr.parse()?;

    // Spawn the engine task (application layer); it attaches the live
    // source itself or falls back to synthetic demo mode.
    let engine = Engine::spawn(config);

    // Create application state
    let state = Arc::new(AppState { engine });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/status", get(status))
        .route("/domain", get(domain))
        .route("/data", get(data))
        .route("/metrics", get(metrics))
        .route("/actions/play", post(toggle_playback))
        .route("/actions/clear", post(clear))
        .route("/actions/zoom", post(zoom))
        .route("/actions/pan", post(pan))
        .route("/actions/reset", post(reset_view))
        .route("/actions/follow", post(toggle_follow))
        .route("/actions/series", post(toggle_series))
        .route("/actions/reconnect", post(reconnect))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    tracing::info!("starting telemetry-insights service on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
