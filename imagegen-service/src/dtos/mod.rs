//! Wire contracts for the image generation endpoint.
//!
//! The request body is parsed field by field rather than through a typed
//! deserialize so that a present-but-wrongly-typed field can be reported as
//! a validation failure instead of a parse failure.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Mime type used when the request does not specify one.
pub const DEFAULT_MIME_TYPE: &str = "image/png";

/// A validated generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub mime_type: String,
    pub model: Option<String>,
    pub negative_prompt: Option<String>,
}

impl GenerationRequest {
    /// Parse and validate a raw request body.
    ///
    /// An empty body is treated as an empty payload, so it fails prompt
    /// validation rather than JSON parsing.
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        let payload = parse_payload(body)?;

        Ok(Self {
            prompt: extract_prompt(&payload)?,
            mime_type: resolve_mime_type(&payload)?,
            model: optional_string(&payload, &["model"]),
            negative_prompt: optional_string(&payload, &["negativePrompt", "negative_prompt"]),
        })
    }
}

fn parse_payload(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if body.is_empty() {
        return Ok(Map::new());
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ApiError::MalformedInput("request body is not valid JSON".to_string()))?;

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::MalformedInput(
            "request body must be a JSON object".to_string(),
        )),
    }
}

fn extract_prompt(payload: &Map<String, Value>) -> Result<String, ApiError> {
    match payload.get("prompt") {
        Some(Value::String(prompt)) => {
            let trimmed = prompt.trim();
            if trimmed.is_empty() {
                Err(ApiError::InvalidPrompt("prompt must not be empty".to_string()))
            } else {
                Ok(trimmed.to_string())
            }
        }
        None | Some(Value::Null) => {
            Err(ApiError::InvalidPrompt("prompt must not be empty".to_string()))
        }
        Some(_) => Err(ApiError::InvalidPrompt("prompt must be a string".to_string())),
    }
}

fn resolve_mime_type(payload: &Map<String, Value>) -> Result<String, ApiError> {
    for key in ["mimeType", "mime_type"] {
        match payload.get(key) {
            Some(Value::String(mime_type)) => {
                let trimmed = mime_type.trim();
                if !trimmed.is_empty() {
                    return Ok(trimmed.to_string());
                }
                // blank falls through to the alias, then the default
            }
            None | Some(Value::Null) => {}
            Some(_) => {
                return Err(ApiError::InvalidPrompt(format!("{} must be a string", key)));
            }
        }
    }

    Ok(DEFAULT_MIME_TYPE.to_string())
}

fn optional_string(payload: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(Value::String(value)) = payload.get(*key) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// One generated image on the wire.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

/// Successful response body.
#[derive(Debug, Serialize)]
pub struct GenerateImageResponse {
    pub images: Vec<ImagePayload>,
}
