//! Prometheus metrics for imagegen-service.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub static IMAGEGEN_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static IMAGEGEN_IMAGES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static PROVIDER_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static PROVIDER_ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Safe to call more than once; only the first call
/// installs the registry.
pub fn init_metrics() {
    let registry = Registry::new();

    let requests_total = IntCounterVec::new(
        Opts::new(
            "imagegen_requests_total",
            "Total image generation requests by outcome",
        ),
        &["model", "code"],
    )
    .expect("Failed to create imagegen_requests_total metric");

    let images_total = IntCounterVec::new(
        Opts::new("imagegen_images_total", "Total images returned to callers"),
        &["model"],
    )
    .expect("Failed to create imagegen_images_total metric");

    let provider_latency = HistogramVec::new(
        HistogramOpts::new(
            "imagegen_provider_latency_seconds",
            "Image provider API latency in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["provider", "model"],
    )
    .expect("Failed to create imagegen_provider_latency_seconds metric");

    let provider_errors = IntCounterVec::new(
        Opts::new(
            "imagegen_provider_errors_total",
            "Total image provider errors",
        ),
        &["provider", "error_type"],
    )
    .expect("Failed to create imagegen_provider_errors_total metric");

    registry
        .register(Box::new(requests_total.clone()))
        .expect("Failed to register imagegen_requests_total");
    registry
        .register(Box::new(images_total.clone()))
        .expect("Failed to register imagegen_images_total");
    registry
        .register(Box::new(provider_latency.clone()))
        .expect("Failed to register imagegen_provider_latency_seconds");
    registry
        .register(Box::new(provider_errors.clone()))
        .expect("Failed to register imagegen_provider_errors_total");

    if REGISTRY.set(registry).is_err() {
        // Already initialized by an earlier call.
        return;
    }
    let _ = IMAGEGEN_REQUESTS_TOTAL.set(requests_total);
    let _ = IMAGEGEN_IMAGES_TOTAL.set(images_total);
    let _ = PROVIDER_LATENCY_SECONDS.set(provider_latency);
    let _ = PROVIDER_ERRORS_TOTAL.set(provider_errors);

    tracing::info!("Prometheus metrics initialized");
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to convert metrics to UTF-8");
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}

// Helper functions for recording metrics

/// Record a completed generation request with its outcome code ("ok" or an
/// error code).
pub fn record_request(model: &str, code: &str) {
    if let Some(counter) = IMAGEGEN_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[model, code]).inc();
    }
}

/// Record the number of images returned to the caller.
pub fn record_images(model: &str, count: u64) {
    if let Some(counter) = IMAGEGEN_IMAGES_TOTAL.get() {
        counter.with_label_values(&[model]).inc_by(count);
    }
}

/// Record provider latency.
pub fn record_provider_latency(provider: &str, model: &str, duration_secs: f64) {
    if let Some(histogram) = PROVIDER_LATENCY_SECONDS.get() {
        histogram
            .with_label_values(&[provider, model])
            .observe(duration_secs);
    }
}

/// Record a provider error.
pub fn record_provider_error(provider: &str, error_type: &str) {
    if let Some(counter) = PROVIDER_ERRORS_TOTAL.get() {
        counter.with_label_values(&[provider, error_type]).inc();
    }
}
