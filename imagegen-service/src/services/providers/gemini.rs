//! Gemini image provider.
//!
//! Calls Google's `generateContent` endpoint with the image response
//! modality and decodes the returned inline data into raw bytes.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use super::{GeneratedImage, ImageProvider, ProviderError};
use crate::config::ProviderConfig;
use crate::dtos::GenerationRequest;

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Finish reasons that mean the prompt was refused.
const BLOCKING_FINISH_REASONS: [&str; 3] = ["SAFETY", "IMAGE_SAFETY", "PROHIBITED_CONTENT"];

/// Gemini image provider.
pub struct GeminiImageProvider {
    config: ProviderConfig,
    client: Client,
}

impl GeminiImageProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn api_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base_url, model
        )
    }

    fn build_request(&self, request: &GenerationRequest) -> GenerateContentRequest {
        let mut parts = vec![TextPart {
            text: request.prompt.clone(),
        }];
        if let Some(negative) = &request.negative_prompt {
            parts.push(TextPart {
                text: format!("Avoid: {}", negative),
            });
        }

        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config: GenerationConfig {
                response_mime_type: request.mime_type.clone(),
                response_modalities: vec!["IMAGE".to_string()],
            },
        }
    }
}

#[async_trait]
impl ImageProvider for GeminiImageProvider {
    async fn generate(
        &self,
        request: &GenerationRequest,
        api_key: &Secret<String>,
    ) -> Result<Vec<GeneratedImage>, ProviderError> {
        let model = request
            .model
            .as_deref()
            .unwrap_or(&self.config.default_model);
        let url = self.api_url(model);
        let body = self.build_request(request);

        tracing::debug!(
            model = %model,
            prompt_len = request.prompt.len(),
            mime_type = %request.mime_type,
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Unavailable("request to Gemini timed out".to_string())
                } else {
                    ProviderError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::QuotaExceeded);
        }
        if status.is_server_error() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Unavailable(format!(
                "Gemini API error {}: {}",
                status, error_text
            )));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Protocol(format!(
                "Gemini API error {}: {}",
                status, error_text
            )));
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Protocol(format!("failed to parse response: {}", e)))?;

        extract_images(api_response, &request.mime_type)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Translate a parsed Gemini response into raw images.
///
/// A payload that carries images is a success regardless of finish signals;
/// a blocked prompt or a blocking finish reason with no images is a
/// rejection.
fn extract_images(
    response: GenerateContentResponse,
    fallback_mime_type: &str,
) -> Result<Vec<GeneratedImage>, ProviderError> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        return Err(ProviderError::Rejected(format!(
            "prompt blocked: {}",
            reason
        )));
    }

    let mut images = Vec::new();
    for candidate in &response.candidates {
        for part in &candidate.content.parts {
            if let Some(inline) = &part.inline_data {
                let bytes = general_purpose::STANDARD.decode(&inline.data).map_err(|e| {
                    ProviderError::Protocol(format!("invalid base64 image payload: {}", e))
                })?;
                let mime_type = inline
                    .mime_type
                    .clone()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| fallback_mime_type.to_string());
                images.push(GeneratedImage { mime_type, bytes });
            }
        }
    }

    if images.is_empty() {
        if let Some(reason) = response
            .candidates
            .iter()
            .filter_map(|c| c.finish_reason.as_deref())
            .find(|r| BLOCKING_FINISH_REASONS.contains(r))
        {
            return Err(ProviderError::Rejected(format!(
                "generation stopped: {}",
                reason
            )));
        }
    }

    Ok(images)
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_modalities: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default, alias = "inline_data")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default, alias = "mime_type")]
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}
