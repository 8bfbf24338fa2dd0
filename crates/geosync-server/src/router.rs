use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::gateway::UpdateGateway;
use crate::handler;
use crate::ws;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: UpdateGateway,
}

/// Build the axum router with all GeoSync endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/datasets", get(handler::list_datasets_handler))
        .route("/datasets/:dataset_id", get(handler::get_dataset_handler))
        .route("/update_data/:dataset_id", post(handler::update_data_handler))
        .route("/ws/:dataset_id", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
