//! Request and response shapes for the assessment API.
//!
//! Responses use camelCase keys to match the frontend contract; request bodies
//! keep the snake_case field names the frontend sends.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictResponse {
    pub prediction: String,
    pub confidence: f64,
    pub severity: f64,
    pub heatmap_url: Option<String>,
    pub probabilities: BTreeMap<String, f64>,
    pub used_gemini_fallback: bool,
}

#[derive(Debug, Deserialize)]
pub struct CompensationRequest {
    #[serde(default = "default_crop")]
    pub crop_type: String,
    #[serde(default = "default_damage")]
    pub damage_type: String,
    #[serde(default)]
    pub severity: f64,
}

fn default_crop() -> String {
    "Wheat".to_string()
}

fn default_damage() -> String {
    "Unknown".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompensationResponse {
    pub total_compensation: f64,
    pub breakdown: CompensationBreakdown,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompensationBreakdown {
    pub crop_type: String,
    pub damage_type: String,
    pub severity: f64,
    pub base_rate: f64,
    pub severity_multiplier: f64,
    pub area_affected: f64,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default = "default_plant")]
    pub crop_type: String,
    #[serde(default = "default_damage")]
    pub damage_type: String,
    #[serde(default)]
    pub severity: f64,
}

fn default_plant() -> String {
    "plant".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub recommendations: Vec<String>,
    pub severity: f64,
    pub damage_type: String,
    pub crop_type: String,
}
