//! Mock provider implementation for tests.

use async_trait::async_trait;
use secrecy::Secret;

use super::{GeneratedImage, ImageProvider, ProviderError};
use crate::dtos::GenerationRequest;

/// Mock image provider returning a canned image set.
pub struct MockImageProvider {
    images: Vec<GeneratedImage>,
}

impl MockImageProvider {
    pub fn new(images: Vec<GeneratedImage>) -> Self {
        Self { images }
    }
}

#[async_trait]
impl ImageProvider for MockImageProvider {
    async fn generate(
        &self,
        _request: &GenerationRequest,
        _api_key: &Secret<String>,
    ) -> Result<Vec<GeneratedImage>, ProviderError> {
        // Simulate some processing
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        Ok(self.images.clone())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
