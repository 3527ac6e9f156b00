//! Image provider abstractions and implementations.
//!
//! This module provides a trait-based abstraction over image generation
//! backends so the handler can be exercised against a mock.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use secrecy::Secret;
use thiserror::Error;

use crate::dtos::GenerationRequest;

/// Classification of provider failures. The handler maps these exhaustively
/// onto HTTP statuses; no provider payload is interpreted beyond this.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider refused the prompt on policy/safety grounds.
    #[error("{0}")]
    Rejected(String),

    /// The provider signalled rate limiting or quota exhaustion.
    #[error("rate limited by provider")]
    QuotaExceeded,

    /// Network failure, timeout, or a 5xx from the provider.
    #[error("{0}")]
    Unavailable(String),

    /// The provider responded with something this adapter cannot interpret.
    #[error("{0}")]
    Protocol(String),
}

impl ProviderError {
    /// Stable label for metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            ProviderError::Rejected(_) => "rejected",
            ProviderError::QuotaExceeded => "quota_exceeded",
            ProviderError::Unavailable(_) => "unavailable",
            ProviderError::Protocol(_) => "protocol",
        }
    }
}

/// One generated asset: raw bytes plus the provider-reported mime type.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Trait for image generation providers.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generate images for the request, in provider order. An empty vector
    /// is a valid result.
    async fn generate(
        &self,
        request: &GenerationRequest,
        api_key: &Secret<String>,
    ) -> Result<Vec<GeneratedImage>, ProviderError>;

    /// Name used in logs and metrics labels.
    fn name(&self) -> &'static str;
}
