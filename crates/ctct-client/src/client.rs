//! Constant Contact v3 HTTP client (reqwest-based).
//!
//! Every request goes through the same pipeline: wait for the shared rate
//! limiter, attach a bearer token, send, and map the response. 401s trigger
//! one token refresh and a single replay; 429s, 5xx responses and network
//! failures are retried by the [`RetryPolicy`].

use crate::auth::{CredentialProvider, TokenStore};
use crate::config::ClientConfig;
use crate::error::{ApiErrorPayload, CtctError, CtctResult};
use crate::models::{
    ActivityReceipt, ContactIdsSource, ListMembershipActivity, Schedule, SignUpFormResponse,
    TestSend,
};
use crate::rate_limit::{parse_retry_after, RateLimiter};
use crate::resource::{
    ResourceDescriptor, Verb, ADD_LIST_MEMBERSHIPS, CAMPAIGN_ACTIVITIES, CONTACTS,
    EMAIL_CAMPAIGNS, MEMBERSHIP_BATCH_SIZE, REMOVE_LIST_MEMBERSHIPS, SIGN_UP_FORM,
};
use crate::retry::RetryPolicy;
use crate::serializer::{extract_remote_id, sign_up_form, RemoteRefs, RemoteResource};
use chrono::{DateTime, Utc};
use ctct_core::{Contact, RemoteId, Token};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a remote delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The vendor answered 404; the resource was already gone.
    AlreadyAbsent,
}

/// Constant Contact API client. Clones share the rate limiter and token
/// cache.
#[derive(Debug, Clone)]
pub struct CtctClient {
    /// API root including the version prefix (e.g. `https://api.cc.email/v3`).
    base_url: String,
    credentials: CredentialProvider,
    http_client: Client,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl CtctClient {
    /// Build a client from configuration and a token store.
    pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> CtctResult<Self> {
        config.validate()?;
        let http_client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("ctct-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CtctError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        let credentials = CredentialProvider::new(config.oauth.clone(), http_client.clone(), store);
        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            credentials,
            http_client,
            limiter: RateLimiter::new(config.rate_limit),
            retry: config.retry,
        })
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    #[must_use]
    pub fn with_http_client(
        base_url: impl Into<String>,
        credentials: CredentialProvider,
        http_client: Client,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            http_client,
            limiter: RateLimiter::default(),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialProvider {
        &self.credentials
    }

    // ── Requests ──────────────────────────────────────────────────────

    /// Send a request to `path` below the API root.
    ///
    /// Returns `Ok(None)` for 204 and for success responses with an empty,
    /// `null` or `{}` body.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> CtctResult<Option<Value>> {
        let url = format!("{}{path}", self.base_url);
        let query: Vec<(String, String)> = query
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        self.request_url(method, &url, &query, body).await
    }

    async fn request_url(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> CtctResult<Option<Value>> {
        let operation = format!("{method} {url}");
        self.retry
            .execute(&operation, || self.send_authorized(method.clone(), url, query, body))
            .await
    }

    async fn send_authorized(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> CtctResult<Option<Value>> {
        let token = self.credentials.access_token().await?;
        let mut response = self.send_once(method.clone(), url, query, body, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.credentials.invalidate(&token).await;
            let token = self.credentials.access_token().await?;
            response = self.send_once(method, url, query, body, &token).await?;
        }

        self.handle_response(response).await
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        body: Option<&Value>,
        token: &Token,
    ) -> CtctResult<reqwest::Response> {
        self.limiter.acquire().await;

        let mut request = self
            .http_client
            .request(method.clone(), url)
            .header("Authorization", token.authorization_header())
            .header("Accept", "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(%method, url, "Sending Constant Contact request");
        Ok(request.send().await?)
    }

    // ── Response Handling ─────────────────────────────────────────────

    async fn handle_response(&self, response: reqwest::Response) -> CtctResult<Option<Value>> {
        let status = response.status();
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().await?;

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(None);
            }
            let value: Value = serde_json::from_str(&body)
                .map_err(|e| CtctError::Parse(format!("failed to parse response: {e}")))?;
            return Ok(match &value {
                Value::Null => None,
                Value::Object(map) if map.is_empty() => None,
                _ => Some(value),
            });
        }

        let payload = ApiErrorPayload::from_body(&body);
        match status {
            StatusCode::NOT_FOUND => Err(CtctError::NotFound(payload.message())),
            StatusCode::UNAUTHORIZED => Err(CtctError::Auth(format!(
                "token rejected after refresh (401): {payload}"
            ))),
            StatusCode::TOO_MANY_REQUESTS => {
                warn!(retry_after_secs = ?retry_after, "Rate limited by Constant Contact");
                Err(CtctError::RateLimited {
                    retry_after_secs: retry_after,
                })
            }
            s if s.is_server_error() => Err(CtctError::Server {
                status: s.as_u16(),
                payload,
            }),
            s => Err(CtctError::Client {
                status: s.as_u16(),
                payload,
            }),
        }
    }

    // ── Pagination ────────────────────────────────────────────────────

    /// Fetch every page of a collection and return the union of items.
    ///
    /// Follows `_links.next.href` until a page has no next link.
    pub async fn list_all(
        &self,
        desc: &ResourceDescriptor,
        query: &[(&str, &str)],
    ) -> CtctResult<Vec<Value>> {
        desc.require(Verb::List)?;

        let mut params: Vec<(String, String)> = query
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        if let Some(limit) = desc.max_page_size {
            if !params.iter().any(|(k, _)| k == "limit") {
                params.push(("limit".into(), limit.to_string()));
            }
        }

        let first = format!("{}{}", self.base_url, desc.endpoint);
        let mut page = self.request_url(Method::GET, &first, &params, None).await?;
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut pages = 0usize;

        while let Some(body) = page {
            pages += 1;
            match body.get(desc.list_key) {
                Some(Value::Array(batch)) => items.extend(batch.iter().cloned()),
                _ => debug!(resource = desc.name, "Page has no items"),
            }

            let Some(href) = body.pointer("/_links/next/href").and_then(Value::as_str) else {
                break;
            };
            if !seen.insert(href.to_string()) {
                return Err(CtctError::Parse(format!(
                    "pagination cursor repeated for {}: {href}",
                    desc.name
                )));
            }
            let next = self.resolve_link(href)?;
            page = self.request_url(Method::GET, &next, &[], None).await?;
        }

        debug!(resource = desc.name, pages, items = items.len(), "Fetched collection");
        Ok(items)
    }

    /// Resolve a `_links` href (relative to the API host) to a full URL.
    fn resolve_link(&self, href: &str) -> CtctResult<String> {
        let base = url::Url::parse(&self.base_url)
            .map_err(|e| CtctError::InvalidConfig(format!("api_url: {e}")))?;
        base.join(href)
            .map(String::from)
            .map_err(|e| CtctError::Parse(format!("invalid next link '{href}': {e}")))
    }

    // ── Resource Operations ───────────────────────────────────────────

    /// Create `record` remotely and return the vendor's response.
    ///
    /// The body is built (and vendor limits checked) before any request.
    pub async fn create<R: RemoteResource>(&self, record: &R, refs: &RemoteRefs) -> CtctResult<Value> {
        let desc = R::DESCRIPTOR;
        desc.require(Verb::Create)?;
        let body = record.to_remote(refs)?;
        self.request(Method::POST, desc.endpoint, &[], Some(&body))
            .await?
            .ok_or_else(|| CtctError::Parse(format!("empty response creating {}", desc.name)))
    }

    /// Update `record` with the descriptor's update method.
    pub async fn update<R: RemoteResource>(
        &self,
        record: &R,
        refs: &RemoteRefs,
    ) -> CtctResult<Option<Value>> {
        let desc = R::DESCRIPTOR;
        desc.require(Verb::Update)?;
        let api_id = record.api_id().ok_or_else(|| {
            CtctError::Unsupported(format!("cannot update {} without a remote id", desc.name))
        })?;
        let body = record.to_remote_update(refs)?;
        self.request(
            desc.update_method.as_method(),
            &desc.item_path(&api_id, None),
            &[],
            Some(&body),
        )
        .await
    }

    /// Fetch one resource. `Ok(None)` means the vendor answered with an
    /// empty body; a 404 is [`CtctError::NotFound`].
    pub async fn retrieve(
        &self,
        desc: &ResourceDescriptor,
        api_id: RemoteId,
    ) -> CtctResult<Option<Value>> {
        desc.require(Verb::Get)?;
        self.request(Method::GET, &desc.item_path(&api_id, None), desc.get_queries, None)
            .await
    }

    /// [`retrieve`](Self::retrieve) and convert to a local record.
    pub async fn fetch<R: RemoteResource>(
        &self,
        api_id: RemoteId,
        refs: &RemoteRefs,
    ) -> CtctResult<Option<R>> {
        match self.retrieve(R::DESCRIPTOR, api_id).await? {
            Some(value) => Ok(Some(R::from_remote(value, refs)?)),
            None => Ok(None),
        }
    }

    /// Every record of a collection, converted to local records.
    pub async fn list<R: RemoteResource>(&self, refs: &RemoteRefs) -> CtctResult<Vec<R>> {
        self.list_all(R::DESCRIPTOR, &[])
            .await?
            .into_iter()
            .map(|value| R::from_remote(value, refs))
            .collect()
    }

    /// Delete one resource. A 404 counts as already deleted.
    pub async fn delete_resource(
        &self,
        desc: &ResourceDescriptor,
        api_id: RemoteId,
    ) -> CtctResult<DeleteOutcome> {
        desc.require(Verb::Delete)?;
        self.delete_path(&desc.item_path(&api_id, None)).await
    }

    async fn delete_path(&self, path: &str) -> CtctResult<DeleteOutcome> {
        match self.request(Method::DELETE, path, &[], None).await {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(CtctError::NotFound(detail)) => {
                debug!(path, detail, "Delete target already absent");
                Ok(DeleteOutcome::AlreadyAbsent)
            }
            Err(e) => Err(e),
        }
    }

    // ── Contacts and Lists ────────────────────────────────────────────

    /// Update-or-create a contact keyed on its email address. Revives
    /// contacts that were deleted remotely.
    pub async fn sign_up_form(
        &self,
        contact: &Contact,
        refs: &RemoteRefs,
    ) -> CtctResult<SignUpFormResponse> {
        let body = serde_json::to_value(sign_up_form(contact, refs)?)?;
        let response = self
            .request(Method::POST, SIGN_UP_FORM, &[], Some(&body))
            .await?
            .ok_or_else(|| CtctError::Parse("empty sign-up form response".into()))?;
        Ok(serde_json::from_value(response)?)
    }

    /// Remote ids of every contact currently in `list`.
    pub async fn list_ids_in_list(&self, list: RemoteId) -> CtctResult<BTreeSet<RemoteId>> {
        let list = list.to_string();
        self.list_all(&CONTACTS, &[("lists", list.as_str())])
            .await?
            .iter()
            .map(|value| extract_remote_id(&CONTACTS, value))
            .collect()
    }

    /// Add contacts to lists, batching to the vendor's per-call cap.
    pub async fn add_list_memberships(
        &self,
        list_ids: &[RemoteId],
        contact_ids: &[RemoteId],
    ) -> CtctResult<Vec<ActivityReceipt>> {
        self.membership_activity(ADD_LIST_MEMBERSHIPS, list_ids, contact_ids)
            .await
    }

    /// Remove contacts from lists, batching to the vendor's per-call cap.
    pub async fn remove_list_memberships(
        &self,
        list_ids: &[RemoteId],
        contact_ids: &[RemoteId],
    ) -> CtctResult<Vec<ActivityReceipt>> {
        self.membership_activity(REMOVE_LIST_MEMBERSHIPS, list_ids, contact_ids)
            .await
    }

    async fn membership_activity(
        &self,
        endpoint: &str,
        list_ids: &[RemoteId],
        contact_ids: &[RemoteId],
    ) -> CtctResult<Vec<ActivityReceipt>> {
        let mut receipts = Vec::new();
        if list_ids.is_empty() || contact_ids.is_empty() {
            return Ok(receipts);
        }
        let list_ids: Vec<_> = list_ids.iter().map(|id| *id.as_uuid()).collect();

        for batch in contact_ids.chunks(MEMBERSHIP_BATCH_SIZE) {
            let body = serde_json::to_value(ListMembershipActivity {
                source: ContactIdsSource {
                    contact_ids: batch.iter().map(|id| *id.as_uuid()).collect(),
                },
                list_ids: list_ids.clone(),
            })?;
            if let Some(response) = self.request(Method::POST, endpoint, &[], Some(&body)).await? {
                receipts.push(serde_json::from_value(response)?);
            }
            info!(endpoint, contacts = batch.len(), "Submitted list membership activity");
        }
        Ok(receipts)
    }

    // ── Campaigns ─────────────────────────────────────────────────────

    /// Find a campaign by its (unique) name.
    pub async fn find_campaign_by_name(&self, name: &str) -> CtctResult<Option<Value>> {
        let found = self
            .list_all(&EMAIL_CAMPAIGNS, &[])
            .await?
            .into_iter()
            .find(|c| c.get("name").and_then(Value::as_str) == Some(name));
        match found {
            Some(summary) => {
                let id = extract_remote_id(&EMAIL_CAMPAIGNS, &summary)?;
                self.retrieve(&EMAIL_CAMPAIGNS, id).await
            }
            None => Ok(None),
        }
    }

    /// Schedule an activity for sending.
    pub async fn schedule(
        &self,
        activity: RemoteId,
        at: DateTime<Utc>,
    ) -> CtctResult<Option<Value>> {
        let body = serde_json::to_value(Schedule { scheduled_date: at })?;
        self.request(
            Method::POST,
            &CAMPAIGN_ACTIVITIES.item_path(&activity, Some("/schedules")),
            &[],
            Some(&body),
        )
        .await
    }

    /// Remove an activity's schedule, returning it to draft.
    pub async fn unschedule(&self, activity: RemoteId) -> CtctResult<DeleteOutcome> {
        self.delete_path(&CAMPAIGN_ACTIVITIES.item_path(&activity, Some("/schedules")))
            .await
    }

    /// Send a preview of an activity to the given addresses.
    pub async fn send_preview(
        &self,
        activity: RemoteId,
        recipients: &[String],
        personal_message: &str,
    ) -> CtctResult<()> {
        if recipients.is_empty() {
            return Err(CtctError::InvalidConfig("no preview recipients configured".into()));
        }
        let body = serde_json::to_value(TestSend {
            email_addresses: recipients.to_vec(),
            personal_message: personal_message.to_string(),
        })?;
        self.request(
            Method::POST,
            &CAMPAIGN_ACTIVITIES.item_path(&activity, Some("/tests")),
            &[],
            Some(&body),
        )
        .await?;
        Ok(())
    }
}
