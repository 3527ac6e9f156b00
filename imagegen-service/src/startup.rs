//! Application startup and lifecycle management.

use crate::config::ImagegenConfig;
use crate::handlers;
use crate::services::credentials::{
    CachedCredentialResolver, CredentialResolver, EnvCredentialResolver, FileCredentialResolver,
};
use crate::services::metrics::init_metrics;
use crate::services::providers::ImageProvider;
use crate::services::providers::gemini::GeminiImageProvider;
use axum::{
    Router,
    routing::{get, post},
};
use service_core::error::AppError;
use service_core::middleware::tracing::{REQUEST_ID_HEADER, request_id_middleware};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ImagegenConfig,
    pub provider: Arc<dyn ImageProvider>,
    pub credentials: Arc<dyn CredentialResolver>,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the Gemini provider and the configured
    /// credential resolver.
    pub async fn build(config: ImagegenConfig) -> Result<Self, AppError> {
        let provider: Arc<dyn ImageProvider> =
            Arc::new(GeminiImageProvider::new(config.provider.clone()));

        let credentials: Arc<dyn CredentialResolver> = match &config.secrets.api_key_file {
            Some(path) => Arc::new(CachedCredentialResolver::new(FileCredentialResolver::new(
                path.clone(),
            ))),
            None => Arc::new(CachedCredentialResolver::new(EnvCredentialResolver::new(
                config.secrets.api_key_var.clone(),
            ))),
        };

        tracing::info!(
            model = %config.provider.default_model,
            endpoint = %config.provider.api_base_url,
            "Initialized Gemini image provider"
        );

        Self::build_with(config, provider, credentials).await
    }

    /// Build with an explicit provider and credential resolver (used by
    /// tests to substitute mocks).
    pub async fn build_with(
        config: ImagegenConfig,
        provider: Arc<dyn ImageProvider>,
        credentials: Arc<dyn CredentialResolver>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let state = AppState {
            config: config.clone(),
            provider,
            credentials,
        };

        let router = Router::new()
            .route("/health", get(handlers::health::health_check))
            .route("/ready", get(handlers::health::readiness_check))
            .route("/metrics", get(handlers::health::metrics_endpoint))
            .route("/images/generate", post(handlers::images::generate_image))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }),
            )
            .layer(axum::middleware::from_fn(request_id_middleware))
            .with_state(state);

        // Bind (port 0 = random port for testing)
        let addr = format!("{}:{}", config.common.host, config.common.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("imagegen service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }
}
