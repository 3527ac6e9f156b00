use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

/// Default Gemini API base URL.
const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model when the request does not name one.
const DEFAULT_IMAGE_MODEL: &str = "gemini-1.5-flash-latest";

/// Default outbound request timeout in seconds.
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct ImagegenConfig {
    pub common: core_config::Config,
    pub provider: ProviderConfig,
    pub secrets: SecretStoreConfig,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the Gemini API. Overridable so tests can stub the
    /// provider with a local server.
    pub api_base_url: String,
    /// Model used when the request does not specify one.
    pub default_model: String,
    /// Outbound request timeout in seconds.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SecretStoreConfig {
    /// Name of the environment variable holding the provider API key.
    pub api_key_var: String,
    /// Optional path to a mounted secret file; takes precedence over the
    /// environment variable when set.
    pub api_key_file: Option<String>,
}

impl ImagegenConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(ImagegenConfig {
            common,
            provider: ProviderConfig {
                api_base_url: get_env("GENAI_API_BASE_URL", Some(DEFAULT_API_BASE_URL), is_prod)?,
                default_model: get_env("GENAI_IMAGE_MODEL", Some(DEFAULT_IMAGE_MODEL), is_prod)?,
                timeout_secs: get_env(
                    "GENAI_PROVIDER_TIMEOUT_SECS",
                    Some(&DEFAULT_PROVIDER_TIMEOUT_SECS.to_string()),
                    is_prod,
                )?
                .parse()
                .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS),
            },
            secrets: SecretStoreConfig {
                api_key_var: get_env("GENAI_API_KEY_VAR", Some("GOOGLE_API_KEY"), is_prod)?,
                api_key_file: env::var("GENAI_API_KEY_FILE").ok().filter(|v| !v.is_empty()),
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
