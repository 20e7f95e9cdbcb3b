//! HTTP behaviour of `CtctClient`: pagination, token refresh on 401,
//! retries, error mapping and bulk membership batching.

mod helpers;

use ctct_client::resource::{CONTACT_LISTS, EMAIL_CAMPAIGNS};
use ctct_client::{CtctError, DeleteOutcome, MemoryTokenStore, RemoteRefs};
use ctct_core::{ContactList, LocalId, RemoteId};
use helpers::{client, client_with_store, token, token_response};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn list_json(name: &str) -> serde_json::Value {
    json!({
        "list_id": RemoteId::new().to_string(),
        "name": name,
        "description": "",
        "favorite": false
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Pagination
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_list_all_follows_next_links() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/contact_lists"))
        .and(query_param("limit", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lists": [list_json("One"), list_json("Two")],
            "_links": { "next": { "href": "/v3/contact_lists?cursor=page2" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v3/contact_lists"))
        .and(query_param("cursor", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lists": [list_json("Three")],
            "_links": { "next": { "href": "/v3/contact_lists?cursor=page3" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v3/contact_lists"))
        .and(query_param("cursor", "page3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lists": [list_json("Four")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let lists: Vec<ContactList> = client(&server).list(&RemoteRefs::new()).await.unwrap();
    let names: Vec<_> = lists.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["One", "Two", "Three", "Four"]);
    assert!(lists.iter().all(|l| l.api_id.is_some()));
}

#[tokio::test]
async fn test_list_all_rejects_repeated_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/contact_lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lists": [],
            "_links": { "next": { "href": "/v3/contact_lists?cursor=loop" } }
        })))
        .mount(&server)
        .await;

    let err = client(&server).list_all(&CONTACT_LISTS, &[]).await.unwrap_err();
    assert!(matches!(err, CtctError::Parse(ref msg) if msg.contains("repeated")));
}

#[tokio::test]
async fn test_list_unsupported_for_activities() {
    let server = MockServer::start().await;
    let err = client(&server)
        .list_all(&ctct_client::resource::CAMPAIGN_ACTIVITIES, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, CtctError::Unsupported(_)));
}

// ═══════════════════════════════════════════════════════════════════════════
// Authentication
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_401_refreshes_once_and_replays() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/contact_lists"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error_key": "unauthorized",
            "error_message": "Unauthorized"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth2/default/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("fresh")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v3/contact_lists"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lists": [list_json("After refresh")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_token(token("stale", 3600)));
    let client = client_with_store(&server, store.clone());

    let items = client.list_all(&CONTACT_LISTS, &[]).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_second_401_is_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/contact_lists"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth2/default/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("fresh")))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).list_all(&CONTACT_LISTS, &[]).await.unwrap_err();
    assert!(matches!(err, CtctError::Auth(_)));
}

#[tokio::test]
async fn test_no_token_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_with_store(&server, Arc::new(MemoryTokenStore::new()));
    let err = client.list_all(&CONTACT_LISTS, &[]).await.unwrap_err();
    assert!(matches!(err, CtctError::NoToken));
}

// ═══════════════════════════════════════════════════════════════════════════
// Retries and Error Mapping
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_429_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/contact_lists"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v3/contact_lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "lists": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let items = client(&server).list_all(&CONTACT_LISTS, &[]).await.unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_server_errors_exhaust_retries_and_keep_payload() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/contact_lists"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!([{
            "error_key": "server.unavailable",
            "error_message": "Try again later"
        }])))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server).list_all(&CONTACT_LISTS, &[]).await.unwrap_err();
    match &err {
        CtctError::MaxRetriesExceeded { attempts, .. } => assert_eq!(*attempts, 3),
        other => panic!("expected MaxRetriesExceeded, got {other:?}"),
    }
    assert_eq!(err.status(), Some(503));
    let payload = err.payload().unwrap();
    assert_eq!(payload.error_key.as_deref(), Some("server.unavailable"));
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/contact_lists"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!([{
            "error_key": "contacts.api.validation.error",
            "error_message": "Name is a duplicate."
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let list = ContactList::new("Newsletter");
    let err = client(&server)
        .create(&list, &RemoteRefs::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(
        err.payload().unwrap().error_message.as_deref(),
        Some("Name is a duplicate.")
    );
}

#[tokio::test]
async fn test_outbound_limit_rejected_before_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let mut list = ContactList::new("placeholder");
    list.name = "x".repeat(256);
    let err = client(&server)
        .create(&list, &RemoteRefs::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CtctError::Validation(ref e) if e.field == "name"));
}

#[tokio::test]
async fn test_retrieve_empty_body_is_none() {
    let server = MockServer::start().await;
    let id = RemoteId::new();

    Mock::given(method("GET"))
        .and(path(format!("/v3/emails/{id}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let found = client(&server).retrieve(&EMAIL_CAMPAIGNS, id).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_retrieve_404_is_not_found() {
    let server = MockServer::start().await;
    let id = RemoteId::new();

    Mock::given(method("GET"))
        .and(path(format!("/v3/contact_lists/{id}")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server).retrieve(&CONTACT_LISTS, id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_outcomes() {
    let server = MockServer::start().await;
    let present = RemoteId::new();
    let absent = RemoteId::new();

    Mock::given(method("DELETE"))
        .and(path(format!("/v3/contact_lists/{present}")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("/v3/contact_lists/{absent}")))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    assert_eq!(
        client.delete_resource(&CONTACT_LISTS, present).await.unwrap(),
        DeleteOutcome::Deleted
    );
    assert_eq!(
        client.delete_resource(&CONTACT_LISTS, absent).await.unwrap(),
        DeleteOutcome::AlreadyAbsent
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Bulk Memberships
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_membership_activity_batches_contacts() {
    let server = MockServer::start().await;
    let list = RemoteId::new();

    Mock::given(method("POST"))
        .and(path("/v3/activities/add_list_memberships"))
        .and(body_partial_json(json!({ "list_ids": [list.to_string()] })))
        .respond_with(|req: &Request| {
            let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
            let count = body["source"]["contact_ids"].as_array().unwrap().len();
            assert!(count <= 500);
            ResponseTemplate::new(201).set_body_json(json!({
                "activity_id": format!("activity-{count}"),
                "state": "initialized"
            }))
        })
        .expect(3)
        .mount(&server)
        .await;

    let contacts: Vec<RemoteId> = (0..1001).map(|_| RemoteId::new()).collect();
    let receipts = client(&server)
        .add_list_memberships(&[list], &contacts)
        .await
        .unwrap();

    let ids: Vec<_> = receipts.iter().map(|r| r.activity_id.as_str()).collect();
    assert_eq!(ids, vec!["activity-500", "activity-500", "activity-1"]);
}

#[tokio::test]
async fn test_membership_activity_with_nothing_to_do_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let receipts = client(&server)
        .remove_list_memberships(&[RemoteId::new()], &[])
        .await
        .unwrap();
    assert!(receipts.is_empty());
}

#[tokio::test]
async fn test_list_ids_in_list() {
    let server = MockServer::start().await;
    let list = RemoteId::new();
    let a = RemoteId::new();
    let b = RemoteId::new();

    Mock::given(method("GET"))
        .and(path("/v3/contacts"))
        .and(query_param("lists", list.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contacts": [
                { "contact_id": a.to_string(), "email_address": { "address": "a@example.com" } },
                { "contact_id": b.to_string(), "email_address": { "address": "b@example.com" } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ids = client(&server).list_ids_in_list(list).await.unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&a) && ids.contains(&b));
}

#[tokio::test]
async fn test_sign_up_form_requires_synced_list() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let contact = ctct_core::Contact::new("a@example.com").with_list(LocalId::new());
    let err = client(&server)
        .sign_up_form(&contact, &RemoteRefs::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CtctError::Validation(ref e) if e.field == "list_memberships"));
}
