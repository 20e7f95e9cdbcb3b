//! Importer passes against a mocked Constant Contact API.

mod helpers;

use ctct_core::{CampaignStatus, Contact, ContactList, EmailCampaign, RemoteId, Source};
use ctct_sync::{Importer, MemoryStore, Repository, Store};
use helpers::{client, store, synced};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn importer(server: &MockServer, store: &Arc<MemoryStore>) -> Importer<MemoryStore> {
    Importer::new(client(server, Arc::clone(store)), Arc::clone(store))
}

#[tokio::test]
async fn test_campaign_stats_dedupe_summaries() {
    let server = MockServer::start().await;
    let store = store();
    let mut campaign = EmailCampaign::new("Spring");
    campaign.current_status = CampaignStatus::Scheduled;
    let campaign = synced(&*store, campaign).await;
    let remote = campaign.api_id.unwrap();

    Mock::given(method("GET"))
        .and(path("/v3/reports/summary_reports/email_campaign_summaries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bulk_email_campaign_summaries": [
                {
                    "campaign_id": remote.to_string(),
                    "unique_counts": { "sends": 120, "opens": 40, "optouts": 2 }
                },
                {
                    "campaign_id": remote.to_string(),
                    "unique_counts": { "sends": 1, "opens": 1 }
                },
                {
                    "campaign_id": RemoteId::new().to_string(),
                    "unique_counts": { "sends": 9 }
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let report = importer(&server, &store).refresh_campaign_stats().await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.unknown, 1);

    let stored: EmailCampaign = Repository::<EmailCampaign>::find(&*store, campaign.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.stats.sends, 120);
    assert_eq!(stored.stats.opt_outs, 2);
    assert_eq!(stored.current_status, CampaignStatus::Done);
}

#[tokio::test]
async fn test_import_all_mirrors_account() {
    let server = MockServer::start().await;
    let store = store();
    let list_id = RemoteId::new();
    let contact_id = RemoteId::new();
    let campaign_id = RemoteId::new();
    let removed_id = RemoteId::new();
    let activity_id = RemoteId::new();

    Mock::given(method("GET"))
        .and(path("/v3/contact_lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lists": [
                { "list_id": list_id.to_string(), "name": "Members" },
                { "list_id": list_id.to_string(), "name": "Members" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/contact_custom_fields"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "custom_fields": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contacts": [{
                "contact_id": contact_id.to_string(),
                "email_address": { "address": "Member@Example.com" },
                "list_memberships": [list_id.to_string()]
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "campaigns": [
                { "campaign_id": campaign_id.to_string(), "name": "Spring", "current_status": "Draft" },
                { "campaign_id": removed_id.to_string(), "name": "Old", "current_status": "Removed" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v3/emails/{campaign_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "campaign_id": campaign_id.to_string(),
            "name": "Spring",
            "current_status": "Draft",
            "campaign_activities": [
                { "campaign_activity_id": activity_id.to_string(), "role": "primary_email" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v3/emails/activities/{activity_id}")))
        .and(query_param("include", "html_content"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "campaign_activity_id": activity_id.to_string(),
            "role": "primary_email",
            "current_status": "DRAFT",
            "subject": "Spring news",
            "html_content": "<html><body>[[trackingImage]]</body></html>",
            "contact_list_ids": [list_id.to_string()]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let report = importer(&server, &store).import_all().await.unwrap();
    assert_eq!(report.contact_lists.created, 1);
    assert_eq!(report.contact_lists.duplicates, 1);
    assert_eq!(report.contacts.created, 1);
    assert_eq!(report.campaigns.created, 1);
    assert_eq!(report.campaigns.skipped, 1);
    assert_eq!(report.activities.created, 1);

    let list: ContactList = Repository::<ContactList>::find_by_api_id(&*store, list_id)
        .await
        .unwrap()
        .unwrap();
    let contact = store.find_contact_by_email("member@example.com").await.unwrap().unwrap();
    assert!(contact.list_memberships.contains(&list.id));

    let campaign: EmailCampaign = Repository::<EmailCampaign>::find_by_api_id(&*store, campaign_id)
        .await
        .unwrap()
        .unwrap();
    let activity = campaign.primary_activity().unwrap();
    assert_eq!(activity.subject, "Spring news");
    assert_eq!(activity.contact_lists, vec![list.id]);
    assert!(Repository::<EmailCampaign>::find_by_api_id(&*store, removed_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_reimport_keeps_local_ids() {
    let server = MockServer::start().await;
    let store = store();
    let existing = synced(&*store, ContactList::new("Old name")).await;

    Mock::given(method("GET"))
        .and(path("/v3/contact_lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lists": [{ "list_id": existing.api_id.unwrap().to_string(), "name": "New name" }]
        })))
        .mount(&server)
        .await;

    let counts = importer(&server, &store).import::<ContactList>(&[]).await.unwrap();
    assert_eq!(counts.updated, 1);

    let lists: Vec<ContactList> = Repository::<ContactList>::all(&*store).await.unwrap();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].id, existing.id);
    assert_eq!(lists[0].name, "New name");
}

#[tokio::test]
async fn test_reimported_activity_counts_as_updated() {
    let server = MockServer::start().await;
    let store = store();
    let activity_id = RemoteId::new();
    let mut campaign = EmailCampaign::new("Spring");
    campaign.primary_activity_mut().unwrap().api_id = Some(activity_id);
    let campaign = synced(&*store, campaign).await;
    let campaign_id = campaign.api_id.unwrap();

    for (resource, key) in [
        ("/v3/contact_lists", "lists"),
        ("/v3/contact_custom_fields", "custom_fields"),
        ("/v3/contacts", "contacts"),
    ] {
        Mock::given(method("GET"))
            .and(path(resource))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ key: [] })))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/v3/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "campaigns": [
                { "campaign_id": campaign_id.to_string(), "name": "Spring", "current_status": "Draft" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v3/emails/{campaign_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "campaign_id": campaign_id.to_string(),
            "name": "Spring",
            "current_status": "Draft",
            "campaign_activities": [
                { "campaign_activity_id": activity_id.to_string(), "role": "primary_email" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v3/emails/activities/{activity_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "campaign_activity_id": activity_id.to_string(),
            "role": "primary_email",
            "current_status": "DRAFT",
            "subject": "Spring news"
        })))
        .mount(&server)
        .await;

    let report = importer(&server, &store).import_all().await.unwrap();
    assert_eq!(report.campaigns.updated, 1);
    assert_eq!(report.activities.updated, 1);
    assert_eq!(report.activities.created, 0);

    let stored: EmailCampaign = Repository::<EmailCampaign>::find(&*store, campaign.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.primary_activity().unwrap().subject, "Spring news");
}

#[tokio::test]
async fn test_refresh_opt_outs_updates_known_contacts() {
    let server = MockServer::start().await;
    let store = store();
    let known = synced(&*store, Contact::new("known@example.com").with_name("Kim", "Known")).await;

    Mock::given(method("GET"))
        .and(path("/v3/contacts"))
        .and(query_param("status", "unsubscribed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contacts": [
                {
                    "contact_id": known.api_id.unwrap().to_string(),
                    "email_address": {
                        "address": "known@example.com",
                        "permission_to_send": "unsubscribed",
                        "opt_out_source": "Contact",
                        "opt_out_date": "2024-03-01T12:00:00Z",
                        "opt_out_reason": "Too many emails"
                    }
                },
                {
                    "contact_id": RemoteId::new().to_string(),
                    "email_address": {
                        "address": "stranger@example.com",
                        "opt_out_source": "Account"
                    }
                }
            ]
        })))
        .mount(&server)
        .await;

    let counts = importer(&server, &store).refresh_opt_outs().await.unwrap();
    assert_eq!(counts.updated, 1);
    assert_eq!(counts.created, 1);

    let stored: Contact = Repository::<Contact>::find(&*store, known.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.opt_out_source, Some(Source::Contact));
    assert_eq!(stored.opt_out_reason.as_deref(), Some("Too many emails"));
    assert_eq!(stored.first_name, "Kim");
    assert!(stored.opted_out());
}
