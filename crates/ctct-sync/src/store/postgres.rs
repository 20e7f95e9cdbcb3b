//! PostgreSQL store.
//!
//! Scalar fields map to columns. Contact sub-objects (custom fields, phone
//! numbers, street addresses, notes) are stored as JSONB; list memberships
//! live in a join table and campaign activities in their own table.

use super::{Repository, Store};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ctct_client::{CtctError, CtctResult, TokenStore};
use ctct_core::{
    CampaignActivity, CampaignStats, Contact, ContactCustomField, ContactList, ContactNote,
    CustomField, EmailCampaign, LocalId, PhoneNumber, Record, RemoteId, StreetAddress, Token,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// PostgreSQL-backed [`Store`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url`.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run all pending migrations from `migrations/`.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Migrations completed successfully");
        Ok(())
    }

    async fn remove_from(&self, table: &'static str, id: LocalId) -> StoreResult<bool> {
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Enum ↔ text through its serde name.
fn enum_to_text<T: Serialize>(resource: &'static str, value: &T) -> StoreResult<String> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => Ok(s),
        Ok(other) => Err(StoreError::corrupt(resource, format!("not a text enum: {other}"))),
        Err(e) => Err(StoreError::corrupt(resource, e)),
    }
}

fn enum_from_text<T: DeserializeOwned>(resource: &'static str, text: &str) -> StoreResult<T> {
    serde_json::from_value(serde_json::Value::String(text.to_string()))
        .map_err(|e| StoreError::corrupt(resource, format!("{text}: {e}")))
}

fn remote(id: Option<Uuid>) -> Option<RemoteId> {
    id.map(RemoteId::from_uuid)
}

/// Fail if `api_id` already belongs to a different row of `table`.
///
/// Runs inside the saving transaction. The advisory lock serializes
/// concurrent saves binding the same remote id until the transaction ends.
async fn check_api_id(
    tx: &mut Transaction<'_, Postgres>,
    table: &'static str,
    resource: &'static str,
    id: LocalId,
    api_id: Option<RemoteId>,
) -> StoreResult<()> {
    let Some(api_id) = api_id else {
        return Ok(());
    };
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(format!("{table}:{api_id}"))
        .execute(&mut **tx)
        .await?;
    let holder: Option<(Uuid,)> = sqlx::query_as(&format!(
        "SELECT id FROM {table} WHERE api_id = $1 AND id <> $2 LIMIT 1 FOR UPDATE"
    ))
    .bind(api_id.as_uuid())
    .bind(id.as_uuid())
    .fetch_optional(&mut **tx)
    .await?;

    match holder {
        Some((existing,)) => Err(StoreError::DuplicateApiId {
            resource,
            api_id,
            existing: LocalId::from_uuid(existing),
        }),
        None => Ok(()),
    }
}

// ── Contact lists ─────────────────────────────────────────────────────────

#[derive(Debug, FromRow)]
struct ContactListRow {
    id: Uuid,
    api_id: Option<Uuid>,
    name: String,
    description: String,
    favorite: bool,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<ContactListRow> for ContactList {
    fn from(row: ContactListRow) -> Self {
        Self {
            id: LocalId::from_uuid(row.id),
            api_id: remote(row.api_id),
            name: row.name,
            description: row.description,
            favorite: row.favorite,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl Repository<ContactList> for PgStore {
    async fn find(&self, id: LocalId) -> StoreResult<Option<ContactList>> {
        let row: Option<ContactListRow> =
            sqlx::query_as("SELECT * FROM contact_lists WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    async fn find_by_api_id(&self, api_id: RemoteId) -> StoreResult<Option<ContactList>> {
        let row: Option<ContactListRow> =
            sqlx::query_as("SELECT * FROM contact_lists WHERE api_id = $1")
                .bind(api_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    async fn all(&self) -> StoreResult<Vec<ContactList>> {
        let rows: Vec<ContactListRow> =
            sqlx::query_as("SELECT * FROM contact_lists ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn save(&self, list: &ContactList) -> StoreResult<()> {
        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;
        check_api_id(&mut tx, "contact_lists", ContactList::RESOURCE, list.id, list.api_id).await?;
        sqlx::query(
            r"
            INSERT INTO contact_lists (id, api_id, name, description, favorite, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                api_id = EXCLUDED.api_id,
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                favorite = EXCLUDED.favorite,
                created_at = EXCLUDED.created_at,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(list.id.as_uuid())
        .bind(list.api_id.map(|id| *id.as_uuid()))
        .bind(&list.name)
        .bind(&list.description)
        .bind(list.favorite)
        .bind(list.created_at)
        .bind(list.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, id: LocalId) -> StoreResult<bool> {
        self.remove_from("contact_lists", id).await
    }
}

// ── Custom fields ─────────────────────────────────────────────────────────

#[derive(Debug, FromRow)]
struct CustomFieldRow {
    id: Uuid,
    api_id: Option<Uuid>,
    label: String,
    name: String,
    field_type: String,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<CustomFieldRow> for CustomField {
    type Error = StoreError;

    fn try_from(row: CustomFieldRow) -> StoreResult<Self> {
        Ok(Self {
            id: LocalId::from_uuid(row.id),
            api_id: remote(row.api_id),
            label: row.label,
            name: row.name,
            field_type: enum_from_text(CustomField::RESOURCE, &row.field_type)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl Repository<CustomField> for PgStore {
    async fn find(&self, id: LocalId) -> StoreResult<Option<CustomField>> {
        let row: Option<CustomFieldRow> =
            sqlx::query_as("SELECT * FROM custom_fields WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn find_by_api_id(&self, api_id: RemoteId) -> StoreResult<Option<CustomField>> {
        let row: Option<CustomFieldRow> =
            sqlx::query_as("SELECT * FROM custom_fields WHERE api_id = $1")
                .bind(api_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn all(&self) -> StoreResult<Vec<CustomField>> {
        let rows: Vec<CustomFieldRow> =
            sqlx::query_as("SELECT * FROM custom_fields ORDER BY label")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn save(&self, field: &CustomField) -> StoreResult<()> {
        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;
        check_api_id(&mut tx, "custom_fields", CustomField::RESOURCE, field.id, field.api_id)
            .await?;
        sqlx::query(
            r"
            INSERT INTO custom_fields (id, api_id, label, name, field_type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                api_id = EXCLUDED.api_id,
                label = EXCLUDED.label,
                name = EXCLUDED.name,
                field_type = EXCLUDED.field_type,
                created_at = EXCLUDED.created_at,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(field.id.as_uuid())
        .bind(field.api_id.map(|id| *id.as_uuid()))
        .bind(&field.label)
        .bind(&field.name)
        .bind(enum_to_text(CustomField::RESOURCE, &field.field_type)?)
        .bind(field.created_at)
        .bind(field.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, id: LocalId) -> StoreResult<bool> {
        self.remove_from("custom_fields", id).await
    }
}

// ── Contacts ──────────────────────────────────────────────────────────────

#[derive(Debug, FromRow)]
struct ContactRow {
    id: Uuid,
    api_id: Option<Uuid>,
    email: String,
    first_name: String,
    last_name: String,
    honorific: String,
    suffix: String,
    job_title: String,
    company_name: String,
    permission_to_send: String,
    create_source: String,
    update_source: String,
    opt_out_source: Option<String>,
    opt_out_date: Option<DateTime<Utc>>,
    opt_out_reason: Option<String>,
    custom_fields: Json<Vec<ContactCustomField>>,
    phone_numbers: Json<Vec<PhoneNumber>>,
    street_addresses: Json<Vec<StreetAddress>>,
    notes: Json<Vec<ContactNote>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl ContactRow {
    fn into_contact(self, list_memberships: BTreeSet<LocalId>) -> StoreResult<Contact> {
        const RESOURCE: &str = Contact::RESOURCE;
        Ok(Contact {
            id: LocalId::from_uuid(self.id),
            api_id: remote(self.api_id),
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            job_title: self.job_title,
            company_name: self.company_name,
            honorific: self.honorific,
            suffix: self.suffix,
            permission_to_send: enum_from_text(RESOURCE, &self.permission_to_send)?,
            create_source: enum_from_text(RESOURCE, &self.create_source)?,
            update_source: enum_from_text(RESOURCE, &self.update_source)?,
            opt_out_source: self
                .opt_out_source
                .as_deref()
                .map(|s| enum_from_text(RESOURCE, s))
                .transpose()?,
            opt_out_date: self.opt_out_date,
            opt_out_reason: self.opt_out_reason,
            list_memberships,
            custom_fields: self.custom_fields.0,
            phone_numbers: self.phone_numbers.0,
            street_addresses: self.street_addresses.0,
            notes: self.notes.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PgStore {
    /// Attach list memberships to contact rows.
    async fn hydrate_contacts(&self, rows: Vec<ContactRow>) -> StoreResult<Vec<Contact>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let pairs: Vec<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT contact_id, list_id FROM contact_list_memberships WHERE contact_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut memberships: HashMap<Uuid, BTreeSet<LocalId>> = HashMap::new();
        for (contact, list) in pairs {
            memberships
                .entry(contact)
                .or_default()
                .insert(LocalId::from_uuid(list));
        }

        rows.into_iter()
            .map(|row| {
                let lists = memberships.remove(&row.id).unwrap_or_default();
                row.into_contact(lists)
            })
            .collect()
    }

    async fn fetch_contacts(&self, sql: &str, bind: Option<Uuid>) -> StoreResult<Vec<Contact>> {
        let mut query = sqlx::query_as::<_, ContactRow>(sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await?;
        self.hydrate_contacts(rows).await
    }
}

#[async_trait]
impl Repository<Contact> for PgStore {
    async fn find(&self, id: LocalId) -> StoreResult<Option<Contact>> {
        Ok(self
            .fetch_contacts("SELECT * FROM contacts WHERE id = $1", Some(*id.as_uuid()))
            .await?
            .pop())
    }

    async fn find_by_api_id(&self, api_id: RemoteId) -> StoreResult<Option<Contact>> {
        Ok(self
            .fetch_contacts(
                "SELECT * FROM contacts WHERE api_id = $1",
                Some(*api_id.as_uuid()),
            )
            .await?
            .pop())
    }

    async fn all(&self) -> StoreResult<Vec<Contact>> {
        self.fetch_contacts("SELECT * FROM contacts ORDER BY email", None)
            .await
    }

    async fn save(&self, contact: &Contact) -> StoreResult<()> {
        const RESOURCE: &str = Contact::RESOURCE;
        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;
        check_api_id(&mut tx, "contacts", RESOURCE, contact.id, contact.api_id).await?;

        sqlx::query(
            r"
            INSERT INTO contacts (
                id, api_id, email, first_name, last_name, honorific, suffix, job_title,
                company_name, permission_to_send, create_source, update_source,
                opt_out_source, opt_out_date, opt_out_reason,
                custom_fields, phone_numbers, street_addresses, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21)
            ON CONFLICT (id) DO UPDATE SET
                api_id = EXCLUDED.api_id,
                email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                honorific = EXCLUDED.honorific,
                suffix = EXCLUDED.suffix,
                job_title = EXCLUDED.job_title,
                company_name = EXCLUDED.company_name,
                permission_to_send = EXCLUDED.permission_to_send,
                create_source = EXCLUDED.create_source,
                update_source = EXCLUDED.update_source,
                opt_out_source = EXCLUDED.opt_out_source,
                opt_out_date = EXCLUDED.opt_out_date,
                opt_out_reason = EXCLUDED.opt_out_reason,
                custom_fields = EXCLUDED.custom_fields,
                phone_numbers = EXCLUDED.phone_numbers,
                street_addresses = EXCLUDED.street_addresses,
                notes = EXCLUDED.notes,
                created_at = EXCLUDED.created_at,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(contact.id.as_uuid())
        .bind(contact.api_id.map(|id| *id.as_uuid()))
        .bind(&contact.email)
        .bind(&contact.first_name)
        .bind(&contact.last_name)
        .bind(&contact.honorific)
        .bind(&contact.suffix)
        .bind(&contact.job_title)
        .bind(&contact.company_name)
        .bind(enum_to_text(RESOURCE, &contact.permission_to_send)?)
        .bind(enum_to_text(RESOURCE, &contact.create_source)?)
        .bind(enum_to_text(RESOURCE, &contact.update_source)?)
        .bind(
            contact
                .opt_out_source
                .as_ref()
                .map(|s| enum_to_text(RESOURCE, s))
                .transpose()?,
        )
        .bind(contact.opt_out_date)
        .bind(&contact.opt_out_reason)
        .bind(Json(&contact.custom_fields))
        .bind(Json(&contact.phone_numbers))
        .bind(Json(&contact.street_addresses))
        .bind(Json(&contact.notes))
        .bind(contact.created_at)
        .bind(contact.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM contact_list_memberships WHERE contact_id = $1")
            .bind(contact.id.as_uuid())
            .execute(&mut *tx)
            .await?;
        let lists: Vec<Uuid> = contact
            .list_memberships
            .iter()
            .map(|id| *id.as_uuid())
            .collect();
        if !lists.is_empty() {
            sqlx::query(
                r"
                INSERT INTO contact_list_memberships (contact_id, list_id)
                SELECT $1, UNNEST($2::uuid[])
                ",
            )
            .bind(contact.id.as_uuid())
            .bind(&lists)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, id: LocalId) -> StoreResult<bool> {
        self.remove_from("contacts", id).await
    }
}

// ── Email campaigns ───────────────────────────────────────────────────────

#[derive(Debug, FromRow)]
struct CampaignRow {
    id: Uuid,
    api_id: Option<Uuid>,
    name: String,
    current_status: String,
    scheduled_datetime: Option<DateTime<Utc>>,
    stats: Json<CampaignStats>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct ActivityRow {
    id: Uuid,
    api_id: Option<Uuid>,
    campaign_id: Uuid,
    role: String,
    current_status: String,
    from_name: String,
    from_email: String,
    reply_to_email: String,
    subject: String,
    preheader: String,
    html_content: String,
    contact_lists: Vec<Uuid>,
    physical_address_in_footer: Option<Json<serde_json::Value>>,
    format_type: i16,
}

impl TryFrom<ActivityRow> for CampaignActivity {
    type Error = StoreError;

    fn try_from(row: ActivityRow) -> StoreResult<Self> {
        const RESOURCE: &str = CampaignActivity::RESOURCE;
        Ok(Self {
            id: LocalId::from_uuid(row.id),
            api_id: remote(row.api_id),
            role: row.role.parse().map_err(|e| StoreError::corrupt(RESOURCE, e))?,
            current_status: row
                .current_status
                .parse()
                .map_err(|e| StoreError::corrupt(RESOURCE, e))?,
            from_name: row.from_name,
            from_email: row.from_email,
            reply_to_email: row.reply_to_email,
            subject: row.subject,
            preheader: row.preheader,
            html_content: row.html_content,
            contact_lists: row.contact_lists.into_iter().map(LocalId::from_uuid).collect(),
            physical_address_in_footer: row.physical_address_in_footer.map(|j| j.0),
            format_type: u8::try_from(row.format_type)
                .map_err(|e| StoreError::corrupt(RESOURCE, e))?,
        })
    }
}

impl PgStore {
    async fn fetch_campaigns(&self, sql: &str, bind: Option<Uuid>) -> StoreResult<Vec<EmailCampaign>> {
        let mut query = sqlx::query_as::<_, CampaignRow>(sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let activity_rows: Vec<ActivityRow> = sqlx::query_as(
            "SELECT * FROM campaign_activities WHERE campaign_id = ANY($1) ORDER BY role",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut activities: HashMap<Uuid, Vec<CampaignActivity>> = HashMap::new();
        for row in activity_rows {
            let campaign = row.campaign_id;
            activities.entry(campaign).or_default().push(row.try_into()?);
        }

        rows.into_iter()
            .map(|row| {
                Ok(EmailCampaign {
                    id: LocalId::from_uuid(row.id),
                    api_id: remote(row.api_id),
                    name: row.name,
                    current_status: row
                        .current_status
                        .parse()
                        .map_err(|e| StoreError::corrupt(EmailCampaign::RESOURCE, e))?,
                    scheduled_datetime: row.scheduled_datetime,
                    stats: row.stats.0,
                    activities: activities.remove(&row.id).unwrap_or_default(),
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                })
            })
            .collect()
    }
}

#[async_trait]
impl Repository<EmailCampaign> for PgStore {
    async fn find(&self, id: LocalId) -> StoreResult<Option<EmailCampaign>> {
        Ok(self
            .fetch_campaigns(
                "SELECT * FROM email_campaigns WHERE id = $1",
                Some(*id.as_uuid()),
            )
            .await?
            .pop())
    }

    async fn find_by_api_id(&self, api_id: RemoteId) -> StoreResult<Option<EmailCampaign>> {
        Ok(self
            .fetch_campaigns(
                "SELECT * FROM email_campaigns WHERE api_id = $1",
                Some(*api_id.as_uuid()),
            )
            .await?
            .pop())
    }

    async fn all(&self) -> StoreResult<Vec<EmailCampaign>> {
        self.fetch_campaigns("SELECT * FROM email_campaigns ORDER BY name", None)
            .await
    }

    async fn save(&self, campaign: &EmailCampaign) -> StoreResult<()> {
        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;
        check_api_id(
            &mut tx,
            "email_campaigns",
            EmailCampaign::RESOURCE,
            campaign.id,
            campaign.api_id,
        )
        .await?;
        for activity in &campaign.activities {
            check_api_id(
                &mut tx,
                "campaign_activities",
                CampaignActivity::RESOURCE,
                activity.id,
                activity.api_id,
            )
            .await?;
        }

        sqlx::query(
            r"
            INSERT INTO email_campaigns (id, api_id, name, current_status, scheduled_datetime, stats, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                api_id = EXCLUDED.api_id,
                name = EXCLUDED.name,
                current_status = EXCLUDED.current_status,
                scheduled_datetime = EXCLUDED.scheduled_datetime,
                stats = EXCLUDED.stats,
                created_at = EXCLUDED.created_at,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(campaign.id.as_uuid())
        .bind(campaign.api_id.map(|id| *id.as_uuid()))
        .bind(&campaign.name)
        .bind(campaign.current_status.as_str())
        .bind(campaign.scheduled_datetime)
        .bind(Json(&campaign.stats))
        .bind(campaign.created_at)
        .bind(campaign.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM campaign_activities WHERE campaign_id = $1")
            .bind(campaign.id.as_uuid())
            .execute(&mut *tx)
            .await?;
        for activity in &campaign.activities {
            let lists: Vec<Uuid> = activity
                .contact_lists
                .iter()
                .map(|id| *id.as_uuid())
                .collect();
            sqlx::query(
                r"
                INSERT INTO campaign_activities (
                    id, api_id, campaign_id, role, current_status, from_name, from_email,
                    reply_to_email, subject, preheader, html_content, contact_lists,
                    physical_address_in_footer, format_type
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                ",
            )
            .bind(activity.id.as_uuid())
            .bind(activity.api_id.map(|id| *id.as_uuid()))
            .bind(campaign.id.as_uuid())
            .bind(activity.role.as_str())
            .bind(activity.current_status.as_str())
            .bind(&activity.from_name)
            .bind(&activity.from_email)
            .bind(&activity.reply_to_email)
            .bind(&activity.subject)
            .bind(&activity.preheader)
            .bind(&activity.html_content)
            .bind(&lists)
            .bind(activity.physical_address_in_footer.as_ref().map(Json))
            .bind(i16::from(activity.format_type))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, id: LocalId) -> StoreResult<bool> {
        self.remove_from("email_campaigns", id).await
    }
}

// ── Tokens ────────────────────────────────────────────────────────────────

#[derive(Debug, FromRow)]
struct TokenRow {
    access_token: String,
    refresh_token: String,
    token_type: String,
    scope: Option<String>,
    inserted_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

fn token_store_error(e: sqlx::Error) -> CtctError {
    CtctError::TokenStore(e.to_string())
}

#[async_trait]
impl TokenStore for PgStore {
    async fn current_token(&self) -> CtctResult<Option<Token>> {
        let row: Option<TokenRow> = sqlx::query_as(
            r"
            SELECT access_token, refresh_token, token_type, scope, inserted_at, expires_at
            FROM ctct_tokens
            ORDER BY inserted_at DESC, id DESC
            LIMIT 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(token_store_error)?;

        Ok(row.map(|row| Token {
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            token_type: row.token_type,
            scope: row.scope,
            inserted_at: row.inserted_at,
            expires_at: row.expires_at,
        }))
    }

    async fn save_token(&self, token: &Token) -> CtctResult<()> {
        sqlx::query(
            r"
            INSERT INTO ctct_tokens (access_token, refresh_token, token_type, scope, inserted_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(&token.access_token)
        .bind(&token.refresh_token)
        .bind(&token.token_type)
        .bind(&token.scope)
        .bind(token.inserted_at)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await
        .map_err(token_store_error)?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn contacts_in_list(&self, list: LocalId) -> StoreResult<Vec<Contact>> {
        self.fetch_contacts(
            r"
            SELECT c.* FROM contacts c
            JOIN contact_list_memberships m ON m.contact_id = c.id
            WHERE m.list_id = $1
            ORDER BY c.email
            ",
            Some(*list.as_uuid()),
        )
        .await
    }

    async fn find_contact_by_email(&self, email: &str) -> StoreResult<Option<Contact>> {
        let rows: Vec<ContactRow> =
            sqlx::query_as("SELECT * FROM contacts WHERE email = $1 LIMIT 1")
                .bind(email.trim().to_lowercase())
                .fetch_all(&self.pool)
                .await?;
        Ok(self.hydrate_contacts(rows).await?.pop())
    }
}
