//! OAuth2 code exchange and token refresh against a mock token endpoint.

mod helpers;

use ctct_client::{CtctError, MemoryTokenStore, TokenStore};
use helpers::{provider, token, token_response, REDIRECT_URI};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{basic_auth, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_exchange_code_stores_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/default/v1/token"))
        .and(basic_auth("public-key", "secret-key"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("first")))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let provider = provider(&server, store.clone());

    let issued = provider.exchange_code("abc123").await.unwrap();
    assert_eq!(issued.access_token, "first");
    assert_eq!(issued.refresh_token, "first-refresh");

    let stored = store.current_token().await.unwrap().unwrap();
    assert_eq!(stored, issued);
    assert_eq!(provider.access_token().await.unwrap().access_token, "first");
}

#[tokio::test]
async fn test_exchange_code_redirect_uri_is_sent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/default/v1/token"))
        .and(body_string_contains("redirect_uri=https%3A%2F%2Fexample.com%2Fctct%2Fauth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("first")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server, Arc::new(MemoryTokenStore::new()));
    provider.exchange_code("abc").await.unwrap();
    assert_eq!(provider.oauth().redirect_uri, REDIRECT_URI);
}

#[tokio::test]
async fn test_token_endpoint_error_is_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/default/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "The authorization code is invalid or has expired."
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let err = provider(&server, store.clone())
        .exchange_code("expired")
        .await
        .unwrap_err();

    assert!(matches!(err, CtctError::Auth(ref msg) if msg.contains("invalid_grant")));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_missing_refresh_token_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/default/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "no-refresh",
            "token_type": "Bearer",
            "expires_in": 86400
        })))
        .mount(&server)
        .await;

    let err = provider(&server, Arc::new(MemoryTokenStore::new()))
        .exchange_code("abc")
        .await
        .unwrap_err();
    assert!(matches!(err, CtctError::Auth(ref msg) if msg.contains("refresh_token")));
}

#[tokio::test]
async fn test_expiring_token_is_refreshed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/default/v1/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=old-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("new")))
        .expect(1)
        .mount(&server)
        .await;

    // Inside the 60s refresh margin.
    let store = Arc::new(MemoryTokenStore::with_token(token("old", 30)));
    let provider = provider(&server, store.clone());

    assert_eq!(provider.access_token().await.unwrap().access_token, "new");
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_concurrent_refresh_is_single_flight() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/default/v1/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_response("shared"))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_token(token("expired", -10)));
    let provider = provider(&server, store.clone());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let provider = provider.clone();
        handles.push(tokio::spawn(async move { provider.access_token().await }));
    }
    for handle in handles {
        let token = handle.await.unwrap().unwrap();
        assert_eq!(token.access_token, "shared");
    }

    assert_eq!(store.len().await, 2);
}
