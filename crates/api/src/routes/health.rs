use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when ffmpeg cannot be run.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Name of the loaded detector backend.
    pub detector: String,
    pub ffmpeg_available: bool,
}

/// GET /health -- returns service health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ffmpeg_available = state.settings.ffmpeg.is_available().await;

    let status = if ffmpeg_available { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        detector: state.detector.name().to_string(),
        ffmpeg_available,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
