use anyhow::anyhow;
use axum::{
    Json,
    extract::{Multipart, State},
};
use image::DynamicImage;
use std::collections::BTreeMap;
use std::io::Cursor;

use crate::error::AppError;
use crate::models::PredictResponse;
use crate::services::advice;
use crate::services::classifier::{self, CLASS_NAMES, ClassifierError};
use crate::startup::AppState;

/// Below this confidence the CNN result is discarded in favor of the
/// generative vision fallback.
const CONFIDENCE_THRESHOLD: f64 = 0.60;

/// Confidence and severity reported for fallback answers, where the local
/// model gave us no usable probability.
const FALLBACK_CONFIDENCE: f64 = 0.70;
const FALLBACK_SEVERITY: f64 = 70.0;

/// POST /api/predict
///
/// Multipart form: `file` (required image) and `crop_type` (optional,
/// defaults to "plant").
pub async fn predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, AppError> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut crop_type = "plant".to_string();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(anyhow!("Failed to read multipart field: {}", e))
    })? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let bytes = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(anyhow!("Failed to read file bytes: {}", e))
                })?;
                file_bytes = Some(bytes.to_vec());
            }
            Some("crop_type") => {
                crop_type = field.text().await.map_err(|e| {
                    AppError::BadRequest(anyhow!("Failed to read crop_type: {}", e))
                })?;
            }
            _ => {}
        }
    }

    let file_bytes = file_bytes.ok_or_else(|| AppError::BadRequest(anyhow!("No file part")))?;

    let decoded = classifier::decode_image(&file_bytes)?;
    // The vision fallback gets the full-resolution frame, not the
    // model-input-sized one.
    let vision_frame = decoded.clone();

    // Inference and resizing are CPU-bound; keep them off the runtime threads.
    let handle = state.classifier.clone();
    let (resized, probabilities) = tokio::task::spawn_blocking(move || {
        let resized = classifier::prepare_input(&decoded, handle.input_size());
        let mut scores = handle.predict(&resized)?;
        // A model with more outputs than labels would otherwise push argmax
        // past the label set.
        scores.truncate(CLASS_NAMES.len());
        Ok::<_, ClassifierError>((resized, classifier::normalize_probabilities(scores)))
    })
    .await
    .map_err(|e| AppError::InternalError(anyhow!("inference task failed: {}", e)))??;

    let (best_index, best_prob) = classifier::argmax(&probabilities);
    let confidence = best_prob as f64;

    let probability_map: BTreeMap<String, f64> = CLASS_NAMES
        .iter()
        .zip(probabilities.iter())
        .map(|(name, p)| (name.to_string(), *p as f64))
        .collect();

    if confidence < CONFIDENCE_THRESHOLD {
        tracing::info!(confidence, "CNN uncertain, falling back to Gemini Vision");

        let prompt = advice::vision_fallback_prompt(&crop_type);
        let png = encode_png(&vision_frame)?;
        let raw_label = state.vision_provider.describe_image(&prompt, &png).await?;
        let prediction = advice::clean_vision_label(&raw_label);

        return Ok(Json(PredictResponse {
            prediction,
            confidence: FALLBACK_CONFIDENCE,
            severity: FALLBACK_SEVERITY,
            heatmap_url: None,
            probabilities: probability_map,
            used_gemini_fallback: true,
        }));
    }

    tracing::info!(confidence, class = CLASS_NAMES[best_index], "CNN confident");

    let prediction = CLASS_NAMES[best_index].to_string();
    let severity = classifier::severity_for(&prediction, confidence);

    let renderer = state.heatmap.clone();
    let heatmap_url = tokio::task::spawn_blocking(move || renderer.render_or_none(&resized))
        .await
        .unwrap_or(None);

    Ok(Json(PredictResponse {
        prediction,
        confidence,
        severity,
        heatmap_url,
        probabilities: probability_map,
        used_gemini_fallback: false,
    }))
}

/// Re-encode the uploaded frame as PNG for the vision API's inline data.
fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, AppError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageFormat::Png)
        .map_err(|e| AppError::InternalError(anyhow!("failed to encode image: {}", e)))?;
    Ok(buffer.into_inner())
}
