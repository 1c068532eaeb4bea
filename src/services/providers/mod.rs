//! Generative AI provider abstractions.
//!
//! Trait-based so handlers can swap the Gemini backends for mocks in tests.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Empty response from provider")]
    EmptyResponse,
}

/// Trait for text generation providers (recommendations).
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Generate a free-text response for the prompt.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Trait for vision providers (low-confidence classification fallback).
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Describe an image given a prompt and PNG-encoded bytes.
    async fn describe_image(&self, prompt: &str, png_bytes: &[u8])
        -> Result<String, ProviderError>;
}
