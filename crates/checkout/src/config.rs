//! SDK configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CHECKOUT_API_URL` - Base URL of the checkout backend
//! - `CHECKOUT_API_TOKEN` - Private API token (server-side only)
//!
//! ## Optional
//! - `CHECKOUT_API_VERSION` - API version path segment (default: 2026-01)

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Checkout backend API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct CheckoutApiConfig {
    /// Base URL of the checkout backend (e.g. <https://api.example.com>).
    pub base_url: String,
    /// API version path segment (e.g. 2026-01).
    pub api_version: String,
    /// Private API token (server-side only).
    pub api_token: SecretString,
}

impl std::fmt::Debug for CheckoutApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutApiConfig")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

impl CheckoutApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or the base
    /// URL does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = get_required_env("CHECKOUT_API_URL")?;
        validate_base_url(&base_url, "CHECKOUT_API_URL")?;

        let api_version = get_env_or_default("CHECKOUT_API_VERSION", "2026-01");
        let api_token = get_required_env("CHECKOUT_API_TOKEN").map(SecretString::from)?;

        Ok(Self {
            base_url,
            api_version,
            api_token,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a base URL parses and has a host.
fn validate_base_url(base_url: &str, var_name: &str) -> Result<(), ConfigError> {
    let url = Url::parse(base_url)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must have a host".to_string(),
        ));
    }

    Ok(())
}
