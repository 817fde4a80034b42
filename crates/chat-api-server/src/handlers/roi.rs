use axum::{extract::State, Json};
use tracing::info;

use crate::handlers::AppJson;
use crate::models::chat::{ApiResponse, RoiRequest};
use crate::services::roi::RoiReport;
use crate::state::AppState;
use crate::utils::error::ApiError;

pub async fn calculate_roi_handler(
    State(state): State<AppState>,
    AppJson(request): AppJson<RoiRequest>,
) -> Result<Json<ApiResponse<RoiReport>>, ApiError> {
    let monthly_bill = request
        .monthly_bill
        .filter(|bill| bill.is_finite() && *bill > 0.0)
        .ok_or_else(|| ApiError::BadRequest("Monthly bill is required".to_string()))?;

    let state_name = request.state.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let report = state
        .orchestrator
        .calculate_roi(monthly_bill, state_name)
        .map_err(|e| ApiError::roi(e, state.settings.app.is_development()))?;

    info!(
        "ROI: bill={}, state={:?}, size={}kW, payback={}y",
        report.monthly_bill, report.state, report.system_size_kw, report.payback_years
    );

    Ok(Json(ApiResponse::ok(report)))
}
