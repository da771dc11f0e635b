//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `LAKSHMI_API_BASE_URL` - Base URL of the storefront backend
//!
//! ## Optional
//! - `LAKSHMI_REQUEST_TIMEOUT_SECS` - Network request timeout (default: 10)
//! - `LAKSHMI_BANNER_DISMISS_SECS` - Error banner auto-dismiss delay (default: 5)
//! - `LAKSHMI_REDIRECT_DELAY_SECS` - Post-checkout redirect delay (default: 3)

use std::time::Duration;

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

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the storefront backend API.
    pub api_base_url: Url,
    /// Timeout applied to every network request.
    pub request_timeout: Duration,
    /// How long an error banner stays visible before auto-dismissal.
    pub banner_dismiss_after: Duration,
    /// Delay before navigating to order history after a successful order.
    pub redirect_after_success: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = get_required_env("LAKSHMI_API_BASE_URL")?
            .parse::<Url>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("LAKSHMI_API_BASE_URL".to_string(), e.to_string())
            })?;
        let request_timeout = get_duration_secs("LAKSHMI_REQUEST_TIMEOUT_SECS", 10)?;
        let banner_dismiss_after = get_duration_secs("LAKSHMI_BANNER_DISMISS_SECS", 5)?;
        let redirect_after_success = get_duration_secs("LAKSHMI_REDIRECT_DELAY_SECS", 3)?;

        Ok(Self {
            api_base_url,
            request_timeout,
            banner_dismiss_after,
            redirect_after_success,
        })
    }

    /// Create a configuration with default delays for a given backend URL.
    #[must_use]
    pub const fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            request_timeout: Duration::from_secs(10),
            banner_dismiss_after: Duration::from_secs(5),
            redirect_after_success: Duration::from_secs(3),
        }
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

/// Parse an optional whole-seconds duration variable.
fn get_duration_secs(key: &str, default: u64) -> Result<Duration, ConfigError> {
    get_env_or_default(key, &default.to_string())
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
