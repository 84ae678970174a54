use axum::Json;
use axum::extract::State;
use serde::Serialize;

use watify_pipeline::MetricsSnapshot;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub metrics: MetricsSnapshot,
}

/// `GET /health` -- service status with a metrics snapshot.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        metrics: state.pipeline.metrics().snapshot(),
    })
}

/// `GET /metrics` -- pipeline counters.
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.pipeline.metrics().snapshot())
}
