//! Shared fixtures for the sync integration tests.

#![allow(dead_code)]

use chrono::Utc;
use ctct_client::{
    CredentialProvider, CtctClient, OAuthConfig, RateLimitConfig, RateLimiter, RetryPolicy,
};
use ctct_core::{Record, RemoteId, Token};
use ctct_sync::{MemoryStore, Repository, SyncManager};
use std::sync::Arc;
use wiremock::MockServer;

/// A store holding a valid access token.
pub fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_token(Token::issued(
        "access-1".into(),
        "refresh-1".into(),
        None,
        None,
        3600,
        Utc::now(),
    )))
}

/// Client against the mock server, reading tokens from `store`.
pub fn client(server: &MockServer, store: Arc<MemoryStore>) -> CtctClient {
    let oauth = OAuthConfig::new("public-key", "secret-key", "https://example.com/ctct/auth")
        .with_auth_url(format!("{}/oauth2/default/v1", server.uri()));
    CtctClient::with_http_client(
        format!("{}/v3", server.uri()),
        CredentialProvider::new(oauth, reqwest::Client::new(), store),
        reqwest::Client::new(),
    )
    .with_rate_limiter(RateLimiter::new(RateLimitConfig::disabled()))
    .with_retry(RetryPolicy::new(2, 1))
}

pub fn manager(server: &MockServer) -> (SyncManager<MemoryStore>, Arc<MemoryStore>) {
    let store = store();
    let manager = SyncManager::new(client(server, Arc::clone(&store)), Arc::clone(&store));
    (manager, store)
}

/// Bind `record` to a fresh remote id and save it.
pub async fn synced<R>(store: &MemoryStore, mut record: R) -> R
where
    R: Record,
    MemoryStore: Repository<R>,
{
    record.assign_api_id(RemoteId::new()).unwrap();
    Repository::<R>::save(store, &record).await.unwrap();
    record
}

pub async fn requests(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}
