use axum::extract::{Path, State};
use axum::response::Json;
use geosync_core::UpdateMessage;
use serde_json::{json, Value};

use crate::error::ServerResult;
use crate::gateway::{DatasetSummary, PointsPayload, UpdateResponse};
use crate::router::AppState;

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Ingest a point set. Always acknowledges, and reports whether anything changed.
pub async fn update_data_handler(
    State(state): State<AppState>,
    Path(dataset_id): Path<String>,
    Json(payload): Json<PointsPayload>,
) -> ServerResult<Json<UpdateResponse>> {
    let dataset_id = state.gateway.dataset_id(&dataset_id)?;
    let report = state.gateway.submit(&dataset_id, payload)?;
    Ok(Json(UpdateResponse::from(&report)))
}

pub async fn list_datasets_handler(
    State(state): State<AppState>,
) -> ServerResult<Json<Vec<DatasetSummary>>> {
    Ok(Json(state.gateway.summaries()?))
}

pub async fn get_dataset_handler(
    State(state): State<AppState>,
    Path(dataset_id): Path<String>,
) -> ServerResult<Json<UpdateMessage<Value>>> {
    let dataset_id = state.gateway.dataset_id(&dataset_id)?;
    Ok(Json(state.gateway.current(&dataset_id)?))
}
