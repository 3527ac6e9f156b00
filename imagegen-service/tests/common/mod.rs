use imagegen_service::config::{ImagegenConfig, ProviderConfig, SecretStoreConfig};
use imagegen_service::services::credentials::{CachedCredentialResolver, EnvCredentialResolver};
use imagegen_service::services::providers::ImageProvider;
use imagegen_service::startup::Application;
use service_core::config::Config as CommonConfig;
use std::sync::Arc;
use std::time::Duration;

pub const TEST_API_KEY: &str = "test-api-key";

pub struct TestApp {
    pub address: String,
    pub api_key_var: String,
}

impl TestApp {
    /// Spawn the app with the real Gemini provider pointed at
    /// `api_base_url` (a wiremock server in tests) and a freshly minted
    /// credential variable.
    pub async fn spawn(api_base_url: &str) -> Self {
        let api_key_var = unique_key_var();
        std::env::set_var(&api_key_var, TEST_API_KEY);
        Self::spawn_with_key_var(api_base_url, api_key_var).await
    }

    /// Spawn with a caller-chosen credential variable, which may be unset.
    pub async fn spawn_with_key_var(api_base_url: &str, api_key_var: String) -> Self {
        let config = test_config(api_base_url, &api_key_var);
        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        Self::start(app, api_key_var).await
    }

    /// Spawn with an explicit provider, bypassing the Gemini client.
    pub async fn spawn_with_provider(provider: Arc<dyn ImageProvider>) -> Self {
        let api_key_var = unique_key_var();
        std::env::set_var(&api_key_var, TEST_API_KEY);

        let config = test_config("http://127.0.0.1:1", &api_key_var);
        let credentials = Arc::new(CachedCredentialResolver::new(EnvCredentialResolver::new(
            api_key_var.clone(),
        )));

        let app = Application::build_with(config, provider, credentials)
            .await
            .expect("Failed to build test application");
        Self::start(app, api_key_var).await
    }

    async fn start(app: Application, api_key_var: String) -> Self {
        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept requests by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            api_key_var,
        }
    }

    /// POST a generation request body and return the response.
    pub async fn post_generate(&self, body: String) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}/images/generate", self.address))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to send request")
    }
}

pub fn unique_key_var() -> String {
    format!(
        "IMAGEGEN_TEST_KEY_{}",
        uuid::Uuid::new_v4().simple()
    )
}

fn test_config(api_base_url: &str, api_key_var: &str) -> ImagegenConfig {
    ImagegenConfig {
        common: CommonConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
        },
        provider: ProviderConfig {
            api_base_url: api_base_url.to_string(),
            default_model: "gemini-1.5-flash-latest".to_string(),
            timeout_secs: 5,
        },
        secrets: SecretStoreConfig {
            api_key_var: api_key_var.to_string(),
            api_key_file: None,
        },
    }
}
