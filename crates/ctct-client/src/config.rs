//! Client configuration.

use crate::error::{CtctError, CtctResult};
use crate::rate_limit::RateLimitConfig;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.cc.email";
pub const DEFAULT_API_VERSION: &str = "/v3";
pub const DEFAULT_AUTH_URL: &str = "https://authz.constantcontact.com/oauth2/default";
pub const DEFAULT_AUTH_VERSION: &str = "/v1";

/// Scopes requested during authorization. `offline_access` is what yields a
/// refresh token.
pub const DEFAULT_SCOPES: &[&str] = &[
    "account_read",
    "account_update",
    "contact_data",
    "campaign_data",
    "offline_access",
];

/// OAuth2 application credentials.
///
/// The [`Debug`] impl redacts the client secret.
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// The application's public key.
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

fn default_auth_url() -> String {
    format!("{DEFAULT_AUTH_URL}{DEFAULT_AUTH_VERSION}")
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect()
}

impl OAuthConfig {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            auth_url: default_auth_url(),
            scopes: default_scopes(),
        }
    }

    #[must_use]
    pub fn with_auth_url(mut self, auth_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn token_endpoint(&self) -> String {
        format!("{}/token", self.auth_url)
    }

    #[must_use]
    pub fn authorize_endpoint(&self) -> String {
        format!("{}/authorize", self.auth_url)
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("auth_url", &self.auth_url)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Everything needed to build a [`CtctClient`](crate::client::CtctClient).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API root including the version prefix.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    pub oauth: OAuthConfig,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_api_url() -> String {
    format!("{DEFAULT_API_URL}{DEFAULT_API_VERSION}")
}

fn default_timeout_secs() -> u64 {
    30
}

impl ClientConfig {
    #[must_use]
    pub fn new(oauth: OAuthConfig) -> Self {
        Self {
            api_url: default_api_url(),
            oauth,
            timeout_secs: default_timeout_secs(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Reject configurations that can never work.
    pub fn validate(&self) -> CtctResult<()> {
        if self.oauth.client_id.is_empty() || self.oauth.client_secret.is_empty() {
            return Err(CtctError::InvalidConfig(
                "client_id and client_secret are required".into(),
            ));
        }
        url::Url::parse(&self.api_url)
            .map_err(|e| CtctError::InvalidConfig(format!("api_url: {e}")))?;
        url::Url::parse(&self.oauth.auth_url)
            .map_err(|e| CtctError::InvalidConfig(format!("auth_url: {e}")))?;
        if self.timeout_secs == 0 {
            return Err(CtctError::InvalidConfig("timeout_secs must be positive".into()));
        }
        Ok(())
    }
}
