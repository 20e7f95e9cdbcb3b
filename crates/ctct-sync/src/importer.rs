//! Bulk import of remote state into the local store.
//!
//! Every pass deduplicates the vendor collection by remote id before
//! processing it, since the same id can appear more than once across pages.
//! Records are upserted by remote id, so re-running an import is a no-op
//! for unchanged data.

use crate::error::{SyncError, SyncResult};
use crate::record::SyncRecord;
use crate::store::{Repository, Store};
use ctct_client::models::RemoteCampaignSummary;
use ctct_client::resource::{CAMPAIGN_ACTIVITIES, CAMPAIGN_SUMMARIES, CONTACTS, EMAIL_CAMPAIGNS};
use ctct_client::{apply_summary, extract_remote_id, CtctClient, RemoteResource};
use ctct_core::{
    CampaignActivity, CampaignStatus, Contact, ContactList, CustomField, EmailCampaign, Record,
    RemoteId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-resource import counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCounts {
    pub created: usize,
    pub updated: usize,
    /// Repeated remote ids within one pass.
    pub duplicates: usize,
    /// Vendor objects that failed to convert (logged with the reason).
    pub failed: usize,
    /// Known ids the vendor returned nothing for.
    pub vanished: usize,
    /// Skipped on purpose (e.g. removed campaigns).
    pub skipped: usize,
}

impl ImportCounts {
    #[must_use]
    pub fn processed(&self) -> usize {
        self.created + self.updated
    }
}

/// Result of [`Importer::import_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub contact_lists: ImportCounts,
    pub custom_fields: ImportCounts,
    pub contacts: ImportCounts,
    pub campaigns: ImportCounts,
    pub activities: ImportCounts,
}

/// Result of [`Importer::refresh_campaign_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsReport {
    pub updated: usize,
    pub duplicates: usize,
    /// Summaries for campaigns not stored locally.
    pub unknown: usize,
}

enum Upserted {
    Created,
    Updated,
}

/// Drop entries whose remote id was already seen, counting them.
fn dedupe(
    desc: &ctct_client::ResourceDescriptor,
    values: Vec<Value>,
    counts: &mut ImportCounts,
) -> Vec<(RemoteId, Value)> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(values.len());
    for value in values {
        match extract_remote_id(desc, &value) {
            Ok(id) if seen.insert(id) => unique.push((id, value)),
            Ok(id) => {
                debug!(resource = desc.name, %id, "Duplicate remote id in collection");
                counts.duplicates += 1;
            }
            Err(e) => {
                warn!(resource = desc.name, error = %e, "Skipping entry without id");
                counts.failed += 1;
            }
        }
    }
    unique
}

/// Imports lists, custom fields, contacts and campaigns.
pub struct Importer<S: Store> {
    client: CtctClient,
    store: Arc<S>,
}

impl<S: Store> Importer<S> {
    pub fn new(client: CtctClient, store: Arc<S>) -> Self {
        Self { client, store }
    }

    /// Import everything, in dependency order.
    pub async fn import_all(&self) -> SyncResult<ImportReport> {
        let mut report = ImportReport {
            contact_lists: self.import::<ContactList>(&[]).await?,
            custom_fields: self.import::<CustomField>(&[]).await?,
            ..ImportReport::default()
        };
        report.contacts = self.import::<Contact>(CONTACTS.get_queries).await?;
        let (campaigns, activities) = self.import_campaigns().await?;
        report.campaigns = campaigns;
        report.activities = activities;

        info!(?report, "Import finished");
        Ok(report)
    }

    async fn upsert<R>(&self, mut record: R) -> SyncResult<Upserted>
    where
        R: SyncRecord,
        S: Repository<R>,
    {
        let api_id = record.api_id().ok_or(SyncError::NotSynced {
            resource: R::RESOURCE,
            id: record.id(),
        })?;
        let existing = Repository::<R>::find_by_api_id(&*self.store, api_id).await?;
        let outcome = match &existing {
            Some(existing) => {
                record.set_id(existing.id());
                record.merge_local(existing);
                Upserted::Updated
            }
            None => Upserted::Created,
        };
        Repository::<R>::save(&*self.store, &record).await?;
        Ok(outcome)
    }

    /// Import one collection. References are resolved against what is
    /// already stored, so lists and custom fields go first.
    pub async fn import<R>(&self, query: &[(&str, &str)]) -> SyncResult<ImportCounts>
    where
        R: SyncRecord,
        S: Repository<R>,
    {
        let mut counts = ImportCounts::default();
        let values = self.client.list_all(R::DESCRIPTOR, query).await?;
        let refs = self.store.remote_refs().await?;

        for (api_id, value) in dedupe(R::DESCRIPTOR, values, &mut counts) {
            let record = match R::from_remote(value, &refs) {
                Ok(record) => record,
                Err(e) => {
                    warn!(resource = R::RESOURCE, %api_id, error = %e, "Failed to import record");
                    counts.failed += 1;
                    continue;
                }
            };
            match self.upsert(record).await? {
                Upserted::Created => counts.created += 1,
                Upserted::Updated => counts.updated += 1,
            }
        }

        info!(resource = R::RESOURCE, ?counts, "Imported collection");
        Ok(counts)
    }

    /// Campaigns come back without activity content: fetch each campaign's
    /// detail, then its primary email activity.
    async fn import_campaigns(&self) -> SyncResult<(ImportCounts, ImportCounts)> {
        let mut campaigns = ImportCounts::default();
        let mut activities = ImportCounts::default();
        let values = self.client.list_all(&EMAIL_CAMPAIGNS, &[]).await?;
        let refs = self.store.remote_refs().await?;

        for (api_id, summary) in dedupe(&EMAIL_CAMPAIGNS, values, &mut campaigns) {
            let status = summary.get("current_status").and_then(Value::as_str);
            if status.and_then(|s| s.parse().ok()) == Some(CampaignStatus::Removed) {
                campaigns.skipped += 1;
                continue;
            }

            let Some(detail) = self.client.retrieve(&EMAIL_CAMPAIGNS, api_id).await? else {
                warn!(%api_id, "Campaign vanished between list and detail");
                campaigns.vanished += 1;
                continue;
            };
            let mut campaign = match EmailCampaign::from_remote(detail, &refs) {
                Ok(campaign) => campaign,
                Err(e) => {
                    warn!(%api_id, error = %e, "Failed to import campaign");
                    campaigns.failed += 1;
                    continue;
                }
            };

            let existing = Repository::<EmailCampaign>::find_by_api_id(&*self.store, api_id).await?;
            let known = existing.is_some();
            if let Some(existing) = existing {
                campaign.set_id(existing.id());
                campaign.merge_local(&existing);
                campaigns.updated += 1;
            } else {
                campaigns.created += 1;
            }

            self.attach_primary_activity(&mut campaign, known, &refs, &mut activities)
                .await?;
            Repository::<EmailCampaign>::save(&*self.store, &campaign).await?;
        }

        info!(?campaigns, ?activities, "Imported campaigns");
        Ok((campaigns, activities))
    }

    /// `known` is whether the campaign was already stored.
    async fn attach_primary_activity(
        &self,
        campaign: &mut EmailCampaign,
        known: bool,
        refs: &ctct_client::RemoteRefs,
        counts: &mut ImportCounts,
    ) -> SyncResult<()> {
        let Some(slot) = campaign.primary_activity_mut() else {
            return Ok(());
        };
        let Some(activity_id) = slot.api_id else {
            return Ok(());
        };

        let Some(value) = self
            .client
            .retrieve(&CAMPAIGN_ACTIVITIES, activity_id)
            .await?
        else {
            warn!(%activity_id, "Campaign activity vanished, skipping");
            counts.vanished += 1;
            return Ok(());
        };

        match CampaignActivity::from_remote(value, refs) {
            Ok(mut activity) => {
                activity.set_id(slot.id);
                *slot = activity;
                if known {
                    counts.updated += 1;
                } else {
                    counts.created += 1;
                }
            }
            Err(e) => {
                warn!(%activity_id, error = %e, "Failed to import campaign activity");
                counts.failed += 1;
            }
        }
        Ok(())
    }

    /// Update campaign statistics from the summary report. A campaign that
    /// appears twice in the report is updated once.
    pub async fn refresh_campaign_stats(&self) -> SyncResult<StatsReport> {
        let mut report = StatsReport::default();
        let values = self.client.list_all(&CAMPAIGN_SUMMARIES, &[]).await?;

        let mut counts = ImportCounts::default();
        let unique = dedupe(&CAMPAIGN_SUMMARIES, values, &mut counts);
        report.duplicates = counts.duplicates;

        for (api_id, value) in unique {
            let summary: RemoteCampaignSummary = match serde_json::from_value(value) {
                Ok(summary) => summary,
                Err(e) => {
                    warn!(%api_id, error = %e, "Unreadable campaign summary");
                    continue;
                }
            };
            let Some(mut campaign) =
                Repository::<EmailCampaign>::find_by_api_id(&*self.store, api_id).await?
            else {
                report.unknown += 1;
                continue;
            };
            apply_summary(&mut campaign, &summary);
            Repository::<EmailCampaign>::save(&*self.store, &campaign).await?;
            report.updated += 1;
        }

        info!(?report, "Refreshed campaign statistics");
        Ok(report)
    }

    /// Record opt-outs of unsubscribed contacts. Unknown contacts are
    /// imported whole; known ones only get their opt-out fields updated.
    pub async fn refresh_opt_outs(&self) -> SyncResult<ImportCounts> {
        let mut counts = ImportCounts::default();
        let values = self
            .client
            .list_all(&CONTACTS, &[("status", "unsubscribed")])
            .await?;
        let refs = self.store.remote_refs().await?;

        for (api_id, value) in dedupe(&CONTACTS, values, &mut counts) {
            let remote = match Contact::from_remote(value, &refs) {
                Ok(contact) => contact,
                Err(e) => {
                    warn!(%api_id, error = %e, "Failed to read opted-out contact");
                    counts.failed += 1;
                    continue;
                }
            };

            match Repository::<Contact>::find_by_api_id(&*self.store, api_id).await? {
                Some(mut local) => {
                    local.opt_out_source = remote.opt_out_source;
                    local.opt_out_date = remote.opt_out_date;
                    local.opt_out_reason = remote.opt_out_reason;
                    local.permission_to_send = remote.permission_to_send;
                    Repository::<Contact>::save(&*self.store, &local).await?;
                    counts.updated += 1;
                }
                None => {
                    Repository::<Contact>::save(&*self.store, &remote).await?;
                    counts.created += 1;
                }
            }
        }

        info!(?counts, "Refreshed opt-outs");
        Ok(counts)
    }
}
