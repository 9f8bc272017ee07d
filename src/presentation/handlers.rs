// HTTP request handlers
use crate::application::downsample::DownsampleStrategy;
use crate::application::engine::EngineStatus;
use crate::application::viewport::{Domain, ZoomDirection};
use crate::domain::sample::{AggregateReport, Channel, Sample, SeriesVisibility};
use crate::error::EngineError;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn unavailable(_: EngineError) -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Connection state, latency and playback flags
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<EngineStatus>, StatusCode> {
    state.engine.status().await.map(Json).map_err(unavailable)
}

/// Current viewport domain (null until first data arrives)
pub async fn domain(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Option<Domain>>, StatusCode> {
    state.engine.domain().await.map(Json).map_err(unavailable)
}

#[derive(Deserialize)]
pub struct DataQuery {
    pub from: Option<f64>,
    pub to: Option<f64>,
    pub budget: Option<usize>,
    pub strategy: Option<DownsampleStrategy>,
}

/// Render-ready samples for the requested (or current-domain) range,
/// downsampled when over the decimation threshold
pub async fn data(
    Query(query): Query<DataQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Sample>>, StatusCode> {
    let range = match (query.from, query.to) {
        (Some(from), Some(to)) => Some((from, to)),
        _ => None,
    };
    state
        .engine
        .render(range, query.budget, query.strategy)
        .await
        .map(Json)
        .map_err(unavailable)
}

/// Per-channel aggregates over the visible range
pub async fn metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AggregateReport>, StatusCode> {
    state.engine.metrics().await.map(Json).map_err(unavailable)
}

#[derive(Serialize)]
pub struct PlaybackResponse {
    pub playing: bool,
}

pub async fn toggle_playback(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PlaybackResponse>, StatusCode> {
    state
        .engine
        .toggle_playback()
        .await
        .map(|playing| Json(PlaybackResponse { playing }))
        .map_err(unavailable)
}

pub async fn clear(State(state): State<Arc<AppState>>) -> Result<StatusCode, StatusCode> {
    state.engine.clear().await.map_err(unavailable)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ZoomRequest {
    /// Cursor position as a fraction of the chart width, 0..=1.
    pub cursor: f64,
    pub direction: ZoomDirection,
}

/// Invalid requests keep the previous domain; the response always reflects
/// what is current afterwards.
pub async fn zoom(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ZoomRequest>,
) -> Result<Json<Option<Domain>>, StatusCode> {
    state
        .engine
        .zoom(request.cursor, request.direction)
        .await
        .map(Json)
        .map_err(unavailable)
}

#[derive(Deserialize)]
pub struct PanRequest {
    /// Drag distance as a fraction of the chart width.
    pub delta_fraction: f64,
}

pub async fn pan(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PanRequest>,
) -> Result<Json<Option<Domain>>, StatusCode> {
    state
        .engine
        .pan(request.delta_fraction)
        .await
        .map(Json)
        .map_err(unavailable)
}

pub async fn reset_view(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Option<Domain>>, StatusCode> {
    state.engine.reset_view().await.map(Json).map_err(unavailable)
}

#[derive(Serialize)]
pub struct FollowResponse {
    pub follow: bool,
}

pub async fn toggle_follow(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FollowResponse>, StatusCode> {
    state
        .engine
        .toggle_follow()
        .await
        .map(|follow| Json(FollowResponse { follow }))
        .map_err(unavailable)
}

#[derive(Deserialize)]
pub struct SeriesRequest {
    pub channel: Channel,
}

pub async fn toggle_series(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SeriesRequest>,
) -> Result<Json<SeriesVisibility>, StatusCode> {
    state
        .engine
        .toggle_series(request.channel)
        .await
        .map(Json)
        .map_err(unavailable)
}

/// Manual reconnect, the explicit way out of degraded mode
pub async fn reconnect(State(state): State<Arc<AppState>>) -> Result<StatusCode, StatusCode> {
    state.engine.reconnect().await.map_err(unavailable)?;
    Ok(StatusCode::ACCEPTED)
}
