use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::services::conversation::StoreStats;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    conversations: StoreStats,
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            conversations: state.orchestrator.stats(),
        }),
    )
}
