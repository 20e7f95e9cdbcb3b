//! Synchronization manager.
//!
//! Pushes local records to Constant Contact, pulls remote state back, keeps
//! list memberships in step without churn and drives the campaign activity
//! lifecycle (preview, schedule, unschedule).

use crate::error::{SyncError, SyncResult};
use crate::record::{ConflictLookup, SyncRecord};
use crate::store::{Repository, Store};
use chrono::Utc;
use ctct_client::{CtctClient, CtctError, DeleteOutcome, RemoteRefs, RemoteResource};
use ctct_core::{
    CampaignStatus, Contact, ContactList, EmailCampaign, LocalId, Record, RemoteId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

/// What a [`SyncManager::push`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushOutcome {
    Created,
    Updated,
    /// The create was rejected as a duplicate and the record was bound to the
    /// existing remote resource instead.
    Adopted,
}

/// What a [`SyncManager::delete`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deletion {
    /// Deleted remotely, then locally.
    Deleted,
    /// Remote resource was already gone; deleted locally.
    AlreadyAbsent,
    /// Never pushed; deleted locally without any request.
    LocalOnly,
}

/// Counters for [`SyncManager::bulk_upsert`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertSummary {
    pub created: usize,
    pub updated: usize,
    pub adopted: usize,
    /// Entries skipped because the same record appeared earlier in the batch.
    pub duplicates: usize,
}

/// Result of reconciling one list's memberships.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipChanges {
    pub added: usize,
    pub removed: usize,
    /// Local members without a remote id; push them first.
    pub unsynced: usize,
    /// Remote members with no local record. They are left alone.
    pub unknown_remote: usize,
}

impl MembershipChanges {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// What [`SyncManager::update_contact_lists`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactListsOutcome {
    /// Opted-out contacts cannot be re-added to lists.
    SkippedOptedOut,
    /// Memberships were sent with a full contact update.
    Updated,
    /// The contact belongs to no list, so it was deleted remotely. The local
    /// record keeps its remote id; the vendor revives it on the next sign-up.
    DeletedRemotely,
}

/// Preview email settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSettings {
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl PreviewSettings {
    const DEFAULT_MESSAGE: &'static str = "Please reply with any edits.";

    /// Message for a preview of `campaign`, mentioning its send date when it
    /// is scheduled.
    #[must_use]
    pub fn message_for(&self, campaign: &EmailCampaign) -> String {
        let mut message = self
            .message
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_MESSAGE.to_string());
        if campaign.current_status == CampaignStatus::Scheduled {
            if let Some(at) = campaign.scheduled_datetime {
                message.push_str(&format!(
                    " This campaign is scheduled to be sent on {}.",
                    at.format("%Y-%m-%d %H:%M UTC")
                ));
            }
        }
        message
    }
}

/// Orchestrates pushes, pulls and deletes between a [`Store`] and the API.
pub struct SyncManager<S: Store> {
    client: CtctClient,
    store: Arc<S>,
    preview: PreviewSettings,
}

impl<S: Store> SyncManager<S> {
    pub fn new(client: CtctClient, store: Arc<S>) -> Self {
        Self {
            client,
            store,
            preview: PreviewSettings::default(),
        }
    }

    #[must_use]
    pub fn with_preview(mut self, preview: PreviewSettings) -> Self {
        self.preview = preview;
        self
    }

    pub fn client(&self) -> &CtctClient {
        &self.client
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    async fn load<R>(&self, id: LocalId) -> SyncResult<R>
    where
        R: Record,
        S: Repository<R>,
    {
        Repository::<R>::find(&*self.store, id)
            .await?
            .ok_or(SyncError::MissingRecord {
                resource: R::RESOURCE,
                id,
            })
    }

    fn require_api_id<R: Record>(record: &R) -> SyncResult<RemoteId> {
        record.api_id().ok_or(SyncError::NotSynced {
            resource: R::RESOURCE,
            id: record.id(),
        })
    }

    // ── Push / Pull ───────────────────────────────────────────────────

    /// Create the record remotely if it has no remote id, otherwise update
    /// it; then save it locally.
    ///
    /// Replaying a push for a synced record always issues an update, so a
    /// retried push never creates a second remote resource.
    pub async fn push<R>(&self, record: &mut R) -> SyncResult<PushOutcome>
    where
        R: SyncRecord,
        S: Repository<R>,
    {
        record.validate().map_err(|errors| SyncError::Validation {
            resource: R::RESOURCE,
            errors,
        })?;
        let refs = self.store.remote_refs().await?;

        let outcome = match record.api_id() {
            Some(api_id) => {
                debug!(resource = R::RESOURCE, %api_id, "Updating remote record");
                self.client.update(record, &refs).await?;
                PushOutcome::Updated
            }
            None => match self.client.create(record, &refs).await {
                Ok(response) => {
                    record.absorb_created(&response)?;
                    PushOutcome::Created
                }
                Err(CtctError::Client { status: 409, .. }) if record.conflict_lookup().is_some() => {
                    self.adopt_existing(record, &refs).await?;
                    PushOutcome::Adopted
                }
                Err(e) => return Err(e.into()),
            },
        };

        Repository::<R>::save(&*self.store, record).await?;
        info!(
            resource = R::RESOURCE,
            id = %record.id(),
            api_id = ?record.api_id(),
            ?outcome,
            "Pushed record"
        );
        Ok(outcome)
    }

    /// Bind `record` to the remote resource its create collided with.
    async fn adopt_existing<R: SyncRecord>(&self, record: &mut R, refs: &RemoteRefs) -> SyncResult<()> {
        match record.conflict_lookup() {
            Some(ConflictLookup::CampaignName(name)) => {
                let name = name.to_string();
                warn!(resource = R::RESOURCE, name, "Name already taken remotely, adopting it");
                let existing = self
                    .client
                    .find_campaign_by_name(&name)
                    .await?
                    .ok_or_else(|| {
                        CtctError::NotFound(format!("{} named '{name}' after 409", R::RESOURCE))
                    })?;
                record.absorb_created(&existing)
            }
            Some(ConflictLookup::SignUpForm(contact)) => {
                warn!(email = %contact.email, "Contact already exists remotely, updating it by email");
                let response = self.client.sign_up_form(contact, refs).await?;
                record.assign_api_id(RemoteId::from_uuid(response.contact_id))?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Fetch one record by remote id and store it.
    ///
    /// An existing local record with that remote id keeps its local id and
    /// local-only state. An empty response is [`SyncError::Vanished`].
    pub async fn pull<R>(&self, api_id: RemoteId) -> SyncResult<R>
    where
        R: SyncRecord,
        S: Repository<R>,
    {
        let value = match self.client.retrieve(R::DESCRIPTOR, api_id).await? {
            Some(value) => value,
            None => {
                warn!(resource = R::RESOURCE, %api_id, "Remote record vanished");
                return Err(SyncError::Vanished {
                    resource: R::RESOURCE,
                    api_id,
                });
            }
        };

        let refs = self.store.remote_refs().await?;
        let mut record = R::from_remote(value, &refs)?;
        if let Some(existing) = Repository::<R>::find_by_api_id(&*self.store, api_id).await? {
            record.set_id(existing.id());
            record.merge_local(&existing);
        }
        Repository::<R>::save(&*self.store, &record).await?;
        debug!(resource = R::RESOURCE, %api_id, id = %record.id(), "Pulled record");
        Ok(record)
    }

    /// Push every record, skipping repeats of a record already pushed in
    /// this batch.
    pub async fn bulk_upsert<R>(&self, records: Vec<R>) -> SyncResult<UpsertSummary>
    where
        R: SyncRecord,
        S: Repository<R>,
    {
        let mut summary = UpsertSummary::default();
        let mut seen_local = HashSet::new();
        let mut seen_remote = HashSet::new();

        for mut record in records {
            let first_local = seen_local.insert(record.id());
            let first_remote = record.api_id().map_or(true, |id| seen_remote.insert(id));
            if !(first_local && first_remote) {
                debug!(resource = R::RESOURCE, id = %record.id(), "Skipping duplicate");
                summary.duplicates += 1;
                continue;
            }
            match self.push(&mut record).await? {
                PushOutcome::Created => summary.created += 1,
                PushOutcome::Updated => summary.updated += 1,
                PushOutcome::Adopted => summary.adopted += 1,
            }
            if let Some(api_id) = record.api_id() {
                seen_remote.insert(api_id);
            }
        }

        info!(resource = R::RESOURCE, ?summary, "Bulk upsert finished");
        Ok(summary)
    }

    /// Delete remotely, then locally.
    ///
    /// The local record is only removed once the vendor confirmed the delete
    /// (or reported the resource already gone). Unsynced records are removed
    /// locally without any request.
    pub async fn delete<R>(&self, id: LocalId) -> SyncResult<Deletion>
    where
        R: SyncRecord,
        S: Repository<R>,
    {
        let record: R = self.load(id).await?;
        let deletion = match record.api_id() {
            None => Deletion::LocalOnly,
            Some(api_id) => match self.client.delete_resource(R::DESCRIPTOR, api_id).await? {
                DeleteOutcome::Deleted => Deletion::Deleted,
                DeleteOutcome::AlreadyAbsent => Deletion::AlreadyAbsent,
            },
        };
        Repository::<R>::remove(&*self.store, id).await?;
        info!(resource = R::RESOURCE, %id, ?deletion, "Deleted record");
        Ok(deletion)
    }

    // ── Contacts and Lists ────────────────────────────────────────────

    /// Bring a list's remote membership in line with local state.
    ///
    /// Reads the current remote members first and only issues the add and
    /// remove calls that change something. Remote members unknown locally
    /// are not removed.
    pub async fn upsert_memberships(&self, list_id: LocalId) -> SyncResult<MembershipChanges> {
        let list: ContactList = self.load(list_id).await?;
        let list_api_id = Self::require_api_id(&list)?;
        let mut changes = MembershipChanges::default();

        let mut desired = BTreeSet::new();
        for contact in self.store.contacts_in_list(list_id).await? {
            match contact.api_id {
                Some(api_id) => {
                    desired.insert(api_id);
                }
                None => changes.unsynced += 1,
            }
        }

        let current = self.client.list_ids_in_list(list_api_id).await?;
        let additions: Vec<RemoteId> = desired.difference(&current).copied().collect();

        let mut removals = Vec::new();
        for api_id in current.difference(&desired) {
            if Repository::<Contact>::find_by_api_id(&*self.store, *api_id)
                .await?
                .is_some()
            {
                removals.push(*api_id);
            } else {
                changes.unknown_remote += 1;
            }
        }

        if !additions.is_empty() {
            self.client
                .add_list_memberships(&[list_api_id], &additions)
                .await?;
        }
        if !removals.is_empty() {
            self.client
                .remove_list_memberships(&[list_api_id], &removals)
                .await?;
        }
        changes.added = additions.len();
        changes.removed = removals.len();

        info!(list = %list.name, ?changes, "Reconciled list memberships");
        Ok(changes)
    }

    /// Update-or-create a contact by email through the sign-up form, which
    /// also revives contacts deleted remotely.
    pub async fn upsert_contact_by_email(&self, contact: &mut Contact) -> SyncResult<String> {
        contact.validate().map_err(|errors| SyncError::Validation {
            resource: Contact::RESOURCE,
            errors,
        })?;
        let refs = self.store.remote_refs().await?;
        let response = self.client.sign_up_form(contact, &refs).await?;
        contact.assign_api_id(RemoteId::from_uuid(response.contact_id))?;
        Repository::<Contact>::save(&*self.store, contact).await?;
        info!(email = %contact.email, action = %response.action, "Upserted contact by email");
        Ok(response.action)
    }

    /// Send a contact's list memberships to the vendor.
    ///
    /// A contact with no lists is deleted remotely, since the vendor requires
    /// every contact to belong to at least one list.
    pub async fn update_contact_lists(&self, contact_id: LocalId) -> SyncResult<ContactListsOutcome> {
        let mut contact: Contact = self.load(contact_id).await?;
        let api_id = Self::require_api_id(&contact)?;

        if contact.opted_out() {
            debug!(email = %contact.email, "Contact opted out, not touching lists");
            return Ok(ContactListsOutcome::SkippedOptedOut);
        }

        if contact.list_memberships.is_empty() {
            self.client.delete_resource(Contact::DESCRIPTOR, api_id).await?;
            info!(email = %contact.email, "Contact has no lists, deleted remotely");
            return Ok(ContactListsOutcome::DeletedRemotely);
        }

        self.push(&mut contact).await?;
        Ok(ContactListsOutcome::Updated)
    }

    // ── Campaigns ─────────────────────────────────────────────────────

    /// Send the campaign's new name (the only mutable campaign field).
    pub async fn rename_campaign(&self, campaign_id: LocalId) -> SyncResult<()> {
        let campaign: EmailCampaign = self.load(campaign_id).await?;
        Self::require_api_id(&campaign)?;
        let refs = self.store.remote_refs().await?;
        self.client.update(&campaign, &refs).await?;
        info!(campaign = %campaign.name, "Renamed campaign");
        Ok(())
    }

    /// Email a preview of the primary activity to the configured recipients.
    pub async fn send_activity_preview(&self, campaign_id: LocalId) -> SyncResult<()> {
        let campaign: EmailCampaign = self.load(campaign_id).await?;
        self.send_preview_for(&campaign).await
    }

    async fn send_preview_for(&self, campaign: &EmailCampaign) -> SyncResult<()> {
        let activity_id = self.primary_activity_id(campaign)?;
        let message = self.preview.message_for(campaign);
        self.client
            .send_preview(activity_id, &self.preview.recipients, &message)
            .await?;
        info!(
            campaign = %campaign.name,
            recipients = self.preview.recipients.len(),
            "Sent campaign preview"
        );
        Ok(())
    }

    fn primary_activity_id(&self, campaign: &EmailCampaign) -> SyncResult<RemoteId> {
        let activity = campaign.primary_activity().ok_or_else(|| SyncError::NotSynced {
            resource: ctct_core::CampaignActivity::RESOURCE,
            id: campaign.id,
        })?;
        Self::require_api_id(activity)
    }

    /// Set recipients on the primary activity and schedule it for the
    /// campaign's `scheduled_datetime`.
    pub async fn schedule_activity(&self, campaign_id: LocalId) -> SyncResult<()> {
        let mut campaign: EmailCampaign = self.load(campaign_id).await?;
        let at = campaign.check_schedule(Utc::now())?;
        if !campaign.current_status.can_advance_to(CampaignStatus::Scheduled) {
            return Err(ctct_core::CoreError::InvalidTransition {
                from: campaign.current_status,
                to: CampaignStatus::Scheduled,
            }
            .into());
        }
        let activity_id = self.primary_activity_id(&campaign)?;
        let refs = self.store.remote_refs().await?;

        if let Some(activity) = campaign.primary_activity() {
            self.client.update(activity, &refs).await?;
        }
        self.client.schedule(activity_id, at).await?;
        campaign.advance_to(CampaignStatus::Scheduled)?;

        Repository::<EmailCampaign>::save(&*self.store, &campaign).await?;
        info!(campaign = %campaign.name, %at, "Scheduled campaign");
        Ok(())
    }

    /// Remove the schedule of the primary activity; the vendor returns it to
    /// draft.
    pub async fn unschedule_activity(&self, campaign_id: LocalId) -> SyncResult<()> {
        let mut campaign: EmailCampaign = self.load(campaign_id).await?;
        let activity_id = self.primary_activity_id(&campaign)?;
        self.client.unschedule(activity_id).await?;

        campaign.observe(CampaignStatus::Draft);
        if let Some(activity) = campaign.primary_activity_mut() {
            activity.current_status = CampaignStatus::Draft;
        }
        Repository::<EmailCampaign>::save(&*self.store, &campaign).await?;
        info!(campaign = %campaign.name, "Unscheduled campaign");
        Ok(())
    }

    /// Send the primary activity's content and email a fresh preview.
    ///
    /// The vendor only accepts edits to unscheduled activities, so a
    /// scheduled activity is unscheduled, updated and scheduled again. The
    /// local status stays SCHEDULED throughout. If a step after the
    /// unschedule fails, the schedule is restored; when that fails too the
    /// campaign is recorded as DRAFT, matching the vendor.
    pub async fn update_activity(&self, campaign_id: LocalId) -> SyncResult<()> {
        let campaign: EmailCampaign = self.load(campaign_id).await?;
        let activity_id = self.primary_activity_id(&campaign)?;
        let refs = self.store.remote_refs().await?;
        let was_scheduled = campaign.current_status == CampaignStatus::Scheduled;

        let reschedule_at = if was_scheduled {
            let at = campaign.check_schedule(Utc::now())?;
            self.client.unschedule(activity_id).await?;
            Some(at)
        } else {
            None
        };

        let updated = self.send_activity_content(&campaign, &refs).await;
        if let Some(at) = reschedule_at {
            let rescheduled = self.client.schedule(activity_id, at).await.map_err(SyncError::from);
            match (updated, rescheduled) {
                (Ok(()), Ok(_)) => {}
                (Err(e), Ok(_)) => {
                    warn!(campaign = %campaign.name, error = %e, "Activity update failed, schedule restored");
                    return Err(e);
                }
                (updated, Err(e)) => {
                    self.record_unscheduled(campaign).await?;
                    return Err(updated.err().unwrap_or(e));
                }
            }
        } else {
            updated?;
        }

        info!(campaign = %campaign.name, rescheduled = was_scheduled, "Updated campaign activity");
        Ok(())
    }

    async fn send_activity_content(&self, campaign: &EmailCampaign, refs: &RemoteRefs) -> SyncResult<()> {
        if let Some(activity) = campaign.primary_activity() {
            self.client.update(activity, refs).await?;
        }
        if !self.preview.recipients.is_empty() {
            self.send_preview_for(campaign).await?;
        }
        Ok(())
    }

    /// Store DRAFT after the vendor schedule was lost.
    async fn record_unscheduled(&self, mut campaign: EmailCampaign) -> SyncResult<()> {
        warn!(campaign = %campaign.name, "Could not restore schedule, campaign is now draft");
        campaign.observe(CampaignStatus::Draft);
        if let Some(activity) = campaign.primary_activity_mut() {
            activity.current_status = CampaignStatus::Draft;
        }
        Repository::<EmailCampaign>::save(&*self.store, &campaign).await?;
        Ok(())
    }
}
