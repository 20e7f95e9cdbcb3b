//! OAuth2 authorization code flow and access token management.

use crate::config::OAuthConfig;
use crate::error::{ApiErrorPayload, CtctError, CtctResult};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use ctct_core::Token;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use url::Url;

/// Persistence for OAuth tokens. The most recently saved token is current.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn current_token(&self) -> CtctResult<Option<Token>>;

    async fn save_token(&self, token: &Token) -> CtctResult<()>;
}

/// Token store that keeps every token in memory.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<Vec<Token>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: Token) -> Self {
        Self {
            tokens: RwLock::new(vec![token]),
        }
    }

    /// Number of tokens saved so far.
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn current_token(&self) -> CtctResult<Option<Token>> {
        Ok(self.tokens.read().await.last().cloned())
    }

    async fn save_token(&self, token: &Token) -> CtctResult<()> {
        self.tokens.write().await.push(token.clone());
        Ok(())
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

/// Hands out access tokens, refreshing them when they are about to expire.
///
/// Refreshes are single-flight: the cache mutex is held for the whole
/// refresh, so concurrent callers wait for the first refresh and then reuse
/// its result instead of spending the refresh token twice. Clones share the
/// cache.
#[derive(Clone)]
pub struct CredentialProvider {
    oauth: OAuthConfig,
    http_client: reqwest::Client,
    store: Arc<dyn TokenStore>,
    cached: Arc<Mutex<Option<Token>>>,
    refresh_margin: Duration,
}

impl std::fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("oauth", &self.oauth)
            .field("refresh_margin", &self.refresh_margin)
            .finish_non_exhaustive()
    }
}

impl CredentialProvider {
    /// Tokens are refreshed this long before they expire.
    pub const DEFAULT_REFRESH_MARGIN_SECS: i64 = 60;

    /// Lifetime assumed when the token endpoint omits `expires_in`.
    const FALLBACK_EXPIRES_IN_SECS: i64 = 3600;

    #[must_use]
    pub fn new(oauth: OAuthConfig, http_client: reqwest::Client, store: Arc<dyn TokenStore>) -> Self {
        Self {
            oauth,
            http_client,
            store,
            cached: Arc::new(Mutex::new(None)),
            refresh_margin: Duration::seconds(Self::DEFAULT_REFRESH_MARGIN_SECS),
        }
    }

    #[must_use]
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    #[must_use]
    pub fn oauth(&self) -> &OAuthConfig {
        &self.oauth
    }

    /// URL the account owner visits to grant access.
    ///
    /// Scopes are space separated, which form encoding renders as `+`.
    pub fn authorization_url(&self, state: &str) -> CtctResult<Url> {
        let mut url = Url::parse(&self.oauth.authorize_endpoint())
            .map_err(|e| CtctError::InvalidConfig(format!("authorize endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.oauth.client_id)
            .append_pair("redirect_uri", &self.oauth.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("state", state)
            .append_pair("scope", &self.oauth.scopes.join(" "));
        Ok(url)
    }

    /// Trade an authorization code for the first token pair and store it.
    pub async fn exchange_code(&self, code: &str) -> CtctResult<Token> {
        let token = self
            .request_token(&[
                ("code", code),
                ("redirect_uri", &self.oauth.redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .await?;
        self.store.save_token(&token).await?;
        *self.cached.lock().await = Some(token.clone());
        info!(expires_at = %token.expires_at, "Stored token from authorization code");
        Ok(token)
    }

    /// A token that is valid for at least the refresh margin.
    pub async fn access_token(&self) -> CtctResult<Token> {
        let mut cached = self.cached.lock().await;
        if cached.is_none() {
            *cached = self.store.current_token().await?;
        }
        let current = cached.clone().ok_or(CtctError::NoToken)?;

        if !current.expires_within(Utc::now(), self.refresh_margin) {
            return Ok(current);
        }

        debug!(expires_at = %current.expires_at, "Refreshing access token");
        let refreshed = self
            .request_token(&[
                ("refresh_token", current.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .await?;
        self.store.save_token(&refreshed).await?;
        *cached = Some(refreshed.clone());
        info!(expires_at = %refreshed.expires_at, "Access token refreshed");
        Ok(refreshed)
    }

    /// Mark `rejected` as unusable after a 401.
    ///
    /// Only the token that was actually rejected is expired, so a caller
    /// holding a stale token cannot force a second refresh after another
    /// caller already refreshed.
    pub async fn invalidate(&self, rejected: &Token) {
        let mut cached = self.cached.lock().await;
        if let Some(current) = cached.as_mut() {
            if current.access_token == rejected.access_token {
                warn!("Access token rejected, forcing refresh");
                current.expires_at = Utc::now() - Duration::seconds(1);
            }
        }
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> CtctResult<Token> {
        let response = self
            .http_client
            .post(self.oauth.token_endpoint())
            .basic_auth(&self.oauth.client_id, Some(&self.oauth.client_secret))
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await
            .map_err(|e| CtctError::Auth(format!("token request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let payload = ApiErrorPayload::from_body(&body);
            return Err(CtctError::Auth(format!(
                "token endpoint returned {status}: {payload}"
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| CtctError::Auth(format!("failed to parse token response: {e}")))?;
        let refresh_token = parsed.refresh_token.ok_or_else(|| {
            CtctError::Auth(
                "token response has no refresh_token; is offline_access among the scopes?".into(),
            )
        })?;

        Ok(Token::issued(
            parsed.access_token,
            refresh_token,
            parsed.token_type,
            parsed.scope,
            parsed.expires_in.unwrap_or(Self::FALLBACK_EXPIRES_IN_SECS),
            Utc::now(),
        ))
    }
}
