use axum::{Json, extract::State};

use crate::error::AppError;
use crate::models::{RecommendationRequest, RecommendationResponse};
use crate::services::advice;
use crate::startup::AppState;

/// POST /api/get_recommendation
///
/// Asks the text model for severity-aware agronomist advice and trims the
/// response down to at most three actionable lines.
pub async fn get_recommendation(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>, AppError> {
    let prompt = advice::recommendation_prompt(
        &request.crop_type,
        &request.damage_type,
        request.severity,
    );

    let generated = state.text_provider.generate(&prompt).await?;
    let recommendations = advice::parse_recommendations(&generated);

    tracing::info!(
        crop_type = %request.crop_type,
        damage_type = %request.damage_type,
        count = recommendations.len(),
        "Produced recommendations"
    );

    Ok(Json(RecommendationResponse {
        recommendations,
        severity: request.severity,
        damage_type: request.damage_type,
        crop_type: request.crop_type,
    }))
}
