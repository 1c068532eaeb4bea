//! Mock provider implementations for testing.

use super::{ProviderError, TextProvider, VisionProvider};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Mock text provider returning a canned response.
pub struct MockTextProvider {
    response: Option<String>,
}

impl MockTextProvider {
    /// A provider that always returns `response`.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
        }
    }

    /// A provider that behaves as unconfigured.
    pub fn disabled() -> Self {
        Self { response: None }
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
        self.response.clone().ok_or_else(|| {
            ProviderError::NotConfigured("Mock text provider not enabled".to_string())
        })
    }
}

/// Mock vision provider returning a canned label and recording the image it
/// was handed.
pub struct MockVisionProvider {
    response: Option<String>,
    last_image: Arc<Mutex<Option<Vec<u8>>>>,
}

impl MockVisionProvider {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
            last_image: Arc::new(Mutex::new(None)),
        }
    }

    pub fn disabled() -> Self {
        Self {
            response: None,
            last_image: Arc::new(Mutex::new(None)),
        }
    }

    /// PNG bytes from the most recent `describe_image` call.
    pub fn last_image(&self) -> Option<Vec<u8>> {
        self.last_image.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionProvider for MockVisionProvider {
    async fn describe_image(
        &self,
        _prompt: &str,
        png_bytes: &[u8],
    ) -> Result<String, ProviderError> {
        *self.last_image.lock().unwrap() = Some(png_bytes.to_vec());
        self.response.clone().ok_or_else(|| {
            ProviderError::NotConfigured("Mock vision provider not enabled".to_string())
        })
    }
}
