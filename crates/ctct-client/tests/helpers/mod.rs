//! Shared fixtures for the client integration tests.

#![allow(dead_code)]

use chrono::Utc;
use ctct_client::{
    CredentialProvider, CtctClient, MemoryTokenStore, OAuthConfig, RateLimiter, RetryPolicy,
};
use ctct_core::Token;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::MockServer;

pub const REDIRECT_URI: &str = "https://example.com/ctct/auth";

pub fn token(access: &str, expires_in_secs: i64) -> Token {
    Token::issued(
        access.to_string(),
        format!("{access}-refresh"),
        None,
        None,
        expires_in_secs,
        Utc::now(),
    )
}

/// OAuth settings whose token endpoint lives on the mock server.
pub fn oauth(server: &MockServer) -> OAuthConfig {
    OAuthConfig::new("public-key", "secret-key", REDIRECT_URI)
        .with_auth_url(format!("{}/oauth2/default/v1", server.uri()))
}

pub fn provider(server: &MockServer, store: Arc<MemoryTokenStore>) -> CredentialProvider {
    CredentialProvider::new(oauth(server), reqwest::Client::new(), store)
}

/// Client against the mock server with no throttling and near-zero backoff.
pub fn client_with_store(server: &MockServer, store: Arc<MemoryTokenStore>) -> CtctClient {
    CtctClient::with_http_client(
        format!("{}/v3", server.uri()),
        provider(server, store),
        reqwest::Client::new(),
    )
    .with_rate_limiter(RateLimiter::new(ctct_client::RateLimitConfig::disabled()))
    .with_retry(RetryPolicy::new(2, 1))
}

/// Client holding a valid token `"access-1"`.
pub fn client(server: &MockServer) -> CtctClient {
    client_with_store(server, Arc::new(MemoryTokenStore::with_token(token("access-1", 3600))))
}

pub fn token_response(access: &str) -> Value {
    json!({
        "access_token": access,
        "refresh_token": format!("{access}-refresh"),
        "token_type": "Bearer",
        "expires_in": 86400,
        "scope": "account_read contact_data offline_access"
    })
}
