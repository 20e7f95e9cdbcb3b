//! CLI configuration loaded from environment variables.
//!
//! Loading is fail-fast: required variables must be present and every
//! optional value must parse, or the command exits before touching the
//! database or the API.

use ctct_client::{ClientConfig, OAuthConfig, RateLimitConfig, RetryPolicy};
use ctct_sync::PreviewSettings;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Configuration errors that can occur during environment loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Everything a command needs to reach the API and the database.
#[derive(Debug, Clone)]
pub struct Config {
    pub client: ClientConfig,
    pub database_url: String,
    pub preview: PreviewSettings,
}

impl Config {
    /// Load from the process environment (and a `.env` file, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load through `lookup`, which returns the value of a variable if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |var: &str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(var.to_string()))
        };

        let mut oauth = OAuthConfig::new(
            required("CTCT_PUBLIC_KEY")?,
            required("CTCT_SECRET_KEY")?,
            required("CTCT_REDIRECT_URI")?,
        );
        if let Some(auth_url) = lookup("CTCT_AUTH_URL") {
            oauth = oauth.with_auth_url(auth_url);
        }

        let mut client = ClientConfig::new(oauth);
        if let Some(api_url) = lookup("CTCT_API_URL") {
            client = client.with_api_url(api_url);
        }
        client.timeout_secs = parse_or(&lookup, "CTCT_TIMEOUT_SECS", client.timeout_secs)?;
        client.retry = RetryPolicy {
            max_retries: parse_or(&lookup, "CTCT_MAX_RETRIES", client.retry.max_retries)?,
            ..client.retry
        };
        let requests_per_second = parse_or(
            &lookup,
            "CTCT_REQUESTS_PER_SECOND",
            client.rate_limit.requests_per_second,
        )?;
        client.rate_limit = if requests_per_second == 0 {
            RateLimitConfig::disabled()
        } else {
            RateLimitConfig::new(requests_per_second)
        };

        client.validate().map_err(|e| ConfigError::InvalidValue {
            var: "CTCT_*".to_string(),
            message: e.to_string(),
        })?;

        let preview = PreviewSettings {
            recipients: lookup("CTCT_PREVIEW_RECIPIENTS")
                .map(|s| {
                    s.split(',')
                        .map(str::trim)
                        .filter(|r| !r.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            message: lookup("CTCT_PREVIEW_MESSAGE").filter(|m| !m.trim().is_empty()),
        };

        Ok(Self {
            client,
            database_url: required("DATABASE_URL")?,
            preview,
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var: var.to_string(),
            message: e.to_string(),
        }),
    }
}
