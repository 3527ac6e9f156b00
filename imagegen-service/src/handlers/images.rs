//! Image generation handler.
//!
//! One linear pipeline per request: parse and validate the body, resolve
//! the provider credential, invoke the provider, base64-encode the result.
//! Any failure short-circuits into the [`ApiError`] mapping; no partial
//! responses.

use axum::{Json, body::Bytes, extract::State};
use base64::{Engine as _, engine::general_purpose};
use std::time::Instant;

use crate::dtos::{GenerateImageResponse, GenerationRequest, ImagePayload};
use crate::error::ApiError;
use crate::services::metrics;
use crate::startup::AppState;

pub async fn generate_image(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerateImageResponse>, ApiError> {
    let mut request = GenerationRequest::from_body(&body).map_err(|e| {
        tracing::warn!(error = %e, code = e.code(), "Rejected generation request");
        metrics::record_request("-", e.code());
        e
    })?;

    let model = request
        .model
        .get_or_insert_with(|| state.config.provider.default_model.clone())
        .clone();

    tracing::info!(
        model = %model,
        mime_type = %request.mime_type,
        prompt_len = request.prompt.len(),
        "Generating images"
    );

    let api_key = state.credentials.resolve().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to resolve provider credential");
        let api_error = ApiError::from(e);
        metrics::record_request(&model, api_error.code());
        api_error
    })?;

    let started = Instant::now();
    let result = state.provider.generate(&request, &api_key).await;
    metrics::record_provider_latency(
        state.provider.name(),
        &model,
        started.elapsed().as_secs_f64(),
    );

    let images = result.map_err(|e| {
        tracing::error!(error = %e, model = %model, "Provider call failed");
        metrics::record_provider_error(state.provider.name(), e.error_type());
        let api_error = ApiError::from(e);
        metrics::record_request(&model, api_error.code());
        api_error
    })?;

    let images: Vec<ImagePayload> = images
        .into_iter()
        .map(|image| ImagePayload {
            data: general_purpose::STANDARD.encode(&image.bytes),
            mime_type: image.mime_type,
        })
        .collect();

    tracing::info!(model = %model, images = images.len(), "Generation complete");
    metrics::record_request(&model, "ok");
    metrics::record_images(&model, images.len() as u64);

    Ok(Json(GenerateImageResponse { images }))
}
