//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SWEET_SHOP_API_URL` - Base URL of the Sweet Shop REST service
//!
//! ## Optional
//! - `SWEET_SHOP_TIMEOUT_SECS` - Per-request timeout in seconds (default: 10)

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing environment variable: {0}")]
    MissingEnvVar(&'static str),
    /// An environment variable is set but unusable.
    #[error("invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),
}

/// Sweet Shop client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST service (e.g., `https://api.sweetshop.example`).
    pub base_url: Url,
    /// Bounded timeout applied to every request.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Build a configuration with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnvVar`] if `base_url` is not an
    /// absolute URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            request_timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from a `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `SWEET_SHOP_API_URL` is missing or either
    /// variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = std::env::var("SWEET_SHOP_API_URL")
            .map_err(|_| ConfigError::MissingEnvVar("SWEET_SHOP_API_URL"))?;

        let request_timeout = match std::env::var("SWEET_SHOP_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    ConfigError::InvalidEnvVar("SWEET_SHOP_TIMEOUT_SECS", raw.clone())
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            base_url: parse_base_url(&base_url)?,
            request_timeout,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url: Url = raw
        .parse()
        .map_err(|e| ConfigError::InvalidEnvVar("SWEET_SHOP_API_URL", format!("{raw}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            "SWEET_SHOP_API_URL",
            format!("{raw}: not a base URL"),
        ));
    }
    Ok(url)
}
