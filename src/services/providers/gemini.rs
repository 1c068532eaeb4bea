//! Gemini provider implementations.
//!
//! Text generation for recommendations and multimodal generation for the
//! low-confidence vision fallback, both over the generateContent REST API.

use super::{ProviderError, TextProvider, VisionProvider};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Gemini API base URL.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
}

fn build_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .build()
        .expect("Failed to create HTTP client")
}

/// Gemini text provider.
pub struct GeminiTextProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiTextProvider {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: build_client(),
        }
    }
}

#[async_trait]
impl TextProvider for GeminiTextProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let parts = vec![ContentPart::Text {
            text: prompt.to_string(),
        }];
        generate_content(&self.client, &self.config, parts).await
    }
}

/// Gemini vision provider used when the local classifier is uncertain.
pub struct GeminiVisionProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiVisionProvider {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: build_client(),
        }
    }
}

#[async_trait]
impl VisionProvider for GeminiVisionProvider {
    async fn describe_image(
        &self,
        prompt: &str,
        png_bytes: &[u8],
    ) -> Result<String, ProviderError> {
        let parts = vec![
            ContentPart::Text {
                text: prompt.to_string(),
            },
            ContentPart::InlineData {
                inline_data: InlineData {
                    mime_type: "image/png".to_string(),
                    data: base64::engine::general_purpose::STANDARD.encode(png_bytes),
                },
            },
        ];
        generate_content(&self.client, &self.config, parts).await
    }
}

/// Send a generateContent request and extract the first candidate's text.
async fn generate_content(
    client: &Client,
    config: &GeminiConfig,
    parts: Vec<ContentPart>,
) -> Result<String, ProviderError> {
    if config.api_key.is_empty() {
        return Err(ProviderError::NotConfigured(
            "Gemini API key not configured".to_string(),
        ));
    }

    let request = GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts,
        }],
    };

    let url = format!(
        "{}/models/{}:generateContent?key={}",
        GEMINI_API_BASE, config.model, config.api_key
    );

    tracing::debug!(model = %config.model, "Sending request to Gemini API");

    let response = client
        .post(&url)
        .json(&request)
        .send()
        .await
        .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }

        return Err(ProviderError::ApiError(format!(
            "Gemini API error {}: {}",
            status, error_text
        )));
    }

    let api_response: GenerateContentResponse = response
        .json()
        .await
        .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

    let candidate = api_response
        .candidates
        .first()
        .ok_or(ProviderError::EmptyResponse)?;

    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return Err(ProviderError::ContentFiltered);
    }

    candidate
        .content
        .parts
        .iter()
        .find_map(|p| match p {
            ContentPart::Text { text } => Some(text.clone()),
            _ => None,
        })
        .ok_or(ProviderError::EmptyResponse)
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ContentPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Content,
    #[serde(default)]
    finish_reason: Option<String>,
}
