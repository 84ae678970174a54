use axum::Json;
use axum::extract::State;
use serde_json::Value;

use watify_pipeline::BatchReport;

use super::AppState;
use crate::error::ServerError;

/// `POST /v1/events/records` -- run the download stage on a record-stream
/// batch.
pub async fn records(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<BatchReport>, ServerError> {
    let report = state.pipeline.download().handle_notification(&payload).await?;
    Ok(Json(report))
}

/// `POST /v1/events/objects` -- run the watify stage on an object
/// notification batch.
pub async fn objects(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<BatchReport>, ServerError> {
    let report = state.pipeline.watify().handle_notification(&payload).await?;
    Ok(Json(report))
}
