//! Serializable sync jobs.
//!
//! A [`SyncJob`] describes one manager operation so that it can be queued,
//! persisted or passed on the command line as JSON, then executed with
//! [`SyncManager::run_job`].

use crate::error::SyncResult;
use crate::manager::{
    ContactListsOutcome, Deletion, MembershipChanges, PushOutcome, SyncManager,
};
use crate::record::SyncRecord;
use crate::store::{Repository, Store};
use crate::SyncError;
use ctct_core::{Contact, ContactList, CustomField, EmailCampaign, LocalId, Record, RemoteId};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Record types a job can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    ContactList,
    CustomField,
    Contact,
    EmailCampaign,
}

impl RecordKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContactList => ContactList::RESOURCE,
            Self::CustomField => CustomField::RESOURCE,
            Self::Contact => Contact::RESOURCE,
            Self::EmailCampaign => EmailCampaign::RESOURCE,
        }
    }
}

/// One unit of sync work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum SyncJob {
    /// Create or update a stored record remotely.
    Push { kind: RecordKind, id: LocalId },

    /// Fetch a record by remote id into the store.
    Pull { kind: RecordKind, api_id: RemoteId },

    /// Delete remotely, then locally.
    Delete { kind: RecordKind, id: LocalId },

    /// Reconcile a list's remote members with local memberships.
    UpsertMemberships { list_id: LocalId },

    /// Send a contact's list memberships.
    UpdateContactLists { contact_id: LocalId },

    RenameCampaign { campaign_id: LocalId },

    ScheduleActivity { campaign_id: LocalId },

    UnscheduleActivity { campaign_id: LocalId },

    /// Send edited activity content, rescheduling if it was scheduled.
    UpdateActivity { campaign_id: LocalId },

    SendPreview { campaign_id: LocalId },
}

/// What a job did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Pushed { result: PushOutcome },
    Pulled { id: LocalId },
    Deleted { result: Deletion },
    Memberships { changes: MembershipChanges },
    ContactLists { result: ContactListsOutcome },
    Done,
}

impl<S: Store> SyncManager<S> {
    /// Execute `job` against this manager.
    pub async fn run_job(&self, job: &SyncJob) -> SyncResult<JobOutcome> {
        info!(?job, "Running sync job");
        let outcome = match *job {
            SyncJob::Push { kind, id } => JobOutcome::Pushed {
                result: match kind {
                    RecordKind::ContactList => self.push_stored::<ContactList>(id).await?,
                    RecordKind::CustomField => self.push_stored::<CustomField>(id).await?,
                    RecordKind::Contact => self.push_stored::<Contact>(id).await?,
                    RecordKind::EmailCampaign => self.push_stored::<EmailCampaign>(id).await?,
                },
            },
            SyncJob::Pull { kind, api_id } => JobOutcome::Pulled {
                id: match kind {
                    RecordKind::ContactList => self.pull::<ContactList>(api_id).await?.id(),
                    RecordKind::CustomField => self.pull::<CustomField>(api_id).await?.id(),
                    RecordKind::Contact => self.pull::<Contact>(api_id).await?.id(),
                    RecordKind::EmailCampaign => self.pull::<EmailCampaign>(api_id).await?.id(),
                },
            },
            SyncJob::Delete { kind, id } => JobOutcome::Deleted {
                result: match kind {
                    RecordKind::ContactList => self.delete::<ContactList>(id).await?,
                    RecordKind::CustomField => self.delete::<CustomField>(id).await?,
                    RecordKind::Contact => self.delete::<Contact>(id).await?,
                    RecordKind::EmailCampaign => self.delete::<EmailCampaign>(id).await?,
                },
            },
            SyncJob::UpsertMemberships { list_id } => JobOutcome::Memberships {
                changes: self.upsert_memberships(list_id).await?,
            },
            SyncJob::UpdateContactLists { contact_id } => JobOutcome::ContactLists {
                result: self.update_contact_lists(contact_id).await?,
            },
            SyncJob::RenameCampaign { campaign_id } => {
                self.rename_campaign(campaign_id).await?;
                JobOutcome::Done
            }
            SyncJob::ScheduleActivity { campaign_id } => {
                self.schedule_activity(campaign_id).await?;
                JobOutcome::Done
            }
            SyncJob::UnscheduleActivity { campaign_id } => {
                self.unschedule_activity(campaign_id).await?;
                JobOutcome::Done
            }
            SyncJob::UpdateActivity { campaign_id } => {
                self.update_activity(campaign_id).await?;
                JobOutcome::Done
            }
            SyncJob::SendPreview { campaign_id } => {
                self.send_activity_preview(campaign_id).await?;
                JobOutcome::Done
            }
        };
        Ok(outcome)
    }

    /// Load a stored record and push it.
    pub async fn push_stored<R>(&self, id: LocalId) -> SyncResult<PushOutcome>
    where
        R: SyncRecord,
        S: Repository<R>,
    {
        let mut record = Repository::<R>::find(&**self.store(), id)
            .await?
            .ok_or(SyncError::MissingRecord {
                resource: R::RESOURCE,
                id,
            })?;
        self.push(&mut record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_json_shape() {
        let id = LocalId::new();
        let job = SyncJob::Push {
            kind: RecordKind::Contact,
            id,
        };
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(
            value,
            json!({ "job": "push", "kind": "contact", "id": id.to_string() })
        );
    }

    #[test]
    fn test_job_parses_from_json() {
        let id = LocalId::new();
        let job: SyncJob = serde_json::from_value(json!({
            "job": "upsert_memberships",
            "list_id": id.to_string(),
        }))
        .unwrap();
        assert_eq!(job, SyncJob::UpsertMemberships { list_id: id });
    }

    #[test]
    fn test_unknown_job_rejected() {
        let result = serde_json::from_value::<SyncJob>(json!({ "job": "explode" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_record_kind_names() {
        assert_eq!(RecordKind::EmailCampaign.as_str(), "email campaign");
        assert_eq!(RecordKind::Contact.as_str(), "contact");
    }
}
