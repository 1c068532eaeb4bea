use axum::Json;

use crate::error::AppError;
use crate::models::{CompensationRequest, CompensationResponse};
use crate::services::compensation;

/// POST /api/calculate_compensation
///
/// Deterministic rate-table arithmetic; never calls out.
pub async fn calculate_compensation(
    Json(request): Json<CompensationRequest>,
) -> Result<Json<CompensationResponse>, AppError> {
    let result = compensation::calculate(
        &request.crop_type,
        &request.damage_type,
        request.severity,
    );

    tracing::info!(
        crop_type = %request.crop_type,
        severity = request.severity,
        total = result.total_compensation,
        "Calculated compensation estimate"
    );

    Ok(Json(result))
}
