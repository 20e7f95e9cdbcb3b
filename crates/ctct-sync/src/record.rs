//! Per-type hooks the sync manager needs beyond plain serialization.

use crate::error::SyncResult;
use ctct_client::resource::EMAIL_CAMPAIGNS;
use ctct_client::{extract_remote_id, RemoteResource};
use ctct_core::{
    ActivityRole, Contact, ContactList, CustomField, EmailCampaign, Record, RemoteId,
};
use serde_json::Value;
use tracing::debug;

/// How to find the remote resource a create collided with (409).
#[derive(Debug, Clone, Copy)]
pub enum ConflictLookup<'a> {
    /// Search campaigns by their unique name.
    CampaignName(&'a str),
    /// Update-or-create through the sign-up form, keyed by email.
    SignUpForm(&'a Contact),
}

/// A record type the [`SyncManager`](crate::SyncManager) can push and pull.
pub trait SyncRecord: RemoteResource {
    /// Bind the record to the ids in a create response.
    fn absorb_created(&mut self, response: &Value) -> SyncResult<()> {
        let api_id = extract_remote_id(Self::DESCRIPTOR, response)?;
        self.assign_api_id(api_id)?;
        Ok(())
    }

    /// Carry local-only state from the stored record into a freshly pulled
    /// one. The local id is handled by the manager.
    fn merge_local(&mut self, _existing: &Self) {}

    /// Lookup used when a create is rejected as a duplicate. `None` means
    /// the conflict is surfaced as an error.
    fn conflict_lookup(&self) -> Option<ConflictLookup<'_>> {
        None
    }
}

impl SyncRecord for ContactList {}

impl SyncRecord for CustomField {}

impl SyncRecord for Contact {
    /// Honorific and suffix have no vendor counterpart.
    fn merge_local(&mut self, existing: &Self) {
        self.honorific.clone_from(&existing.honorific);
        self.suffix.clone_from(&existing.suffix);
    }

    /// A create retried after the vendor already committed it collides on
    /// the email address.
    fn conflict_lookup(&self) -> Option<ConflictLookup<'_>> {
        Some(ConflictLookup::SignUpForm(self))
    }
}

impl SyncRecord for EmailCampaign {
    /// Assigns the campaign id and the ids of every activity the vendor
    /// created alongside it.
    fn absorb_created(&mut self, response: &Value) -> SyncResult<()> {
        let api_id = extract_remote_id(&EMAIL_CAMPAIGNS, response)?;
        self.assign_api_id(api_id)?;

        let stubs = response
            .get("campaign_activities")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for stub in stubs {
            let role = stub
                .get("role")
                .and_then(Value::as_str)
                .map(str::parse::<ActivityRole>);
            let id = stub
                .get("campaign_activity_id")
                .and_then(Value::as_str)
                .map(str::parse::<RemoteId>);
            match (role, id) {
                (Some(Ok(role)), Some(Ok(id))) => {
                    match self.activities.iter_mut().find(|a| a.role == role) {
                        Some(activity) => activity.assign_api_id(id)?,
                        None => {
                            let mut activity = ctct_core::CampaignActivity::new(role);
                            activity.api_id = Some(id);
                            self.activities.push(activity);
                        }
                    }
                }
                _ => debug!(?stub, "Ignoring malformed campaign activity stub"),
            }
        }
        Ok(())
    }

    /// Activity content, schedule and statistics are local; the vendor
    /// payload only carries activity stubs.
    fn merge_local(&mut self, existing: &Self) {
        self.scheduled_datetime = existing.scheduled_datetime;
        self.stats = existing.stats;
        for activity in &mut self.activities {
            if let Some(local) = existing.activity(activity.role) {
                let status = activity.current_status;
                let api_id = activity.api_id;
                *activity = local.clone();
                activity.current_status = status;
                activity.api_id = api_id.or(local.api_id);
            }
        }
        for local in &existing.activities {
            if self.activity(local.role).is_none() {
                self.activities.push(local.clone());
            }
        }
    }

    fn conflict_lookup(&self) -> Option<ConflictLookup<'_>> {
        Some(ConflictLookup::CampaignName(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctct_core::CampaignStatus;
    use serde_json::json;

    #[test]
    fn test_campaign_absorbs_activity_ids() {
        let mut campaign = EmailCampaign::new("Spring");
        let campaign_id = RemoteId::new();
        let primary = RemoteId::new();
        let permalink = RemoteId::new();

        campaign
            .absorb_created(&json!({
                "campaign_id": campaign_id.to_string(),
                "name": "Spring",
                "campaign_activities": [
                    { "campaign_activity_id": primary.to_string(), "role": "primary_email" },
                    { "campaign_activity_id": permalink.to_string(), "role": "permalink" }
                ]
            }))
            .unwrap();

        assert_eq!(campaign.api_id, Some(campaign_id));
        assert_eq!(campaign.primary_activity().unwrap().api_id, Some(primary));
        assert_eq!(
            campaign.activity(ActivityRole::Permalink).unwrap().api_id,
            Some(permalink)
        );
    }

    #[test]
    fn test_absorb_rejects_conflicting_id() {
        let mut list = ContactList::new("Members");
        list.assign_api_id(RemoteId::new()).unwrap();
        let err = list
            .absorb_created(&json!({ "list_id": RemoteId::new().to_string() }))
            .unwrap_err();
        assert!(matches!(err, crate::SyncError::Lifecycle(_)));
    }

    #[test]
    fn test_campaign_merge_keeps_local_content() {
        let mut existing = EmailCampaign::new("Spring");
        existing.primary_activity_mut().unwrap().subject = "Hello".into();
        existing.stats.sends = 10;

        let mut pulled = EmailCampaign::new("Spring");
        let activity = pulled.primary_activity_mut().unwrap();
        activity.api_id = Some(RemoteId::new());
        activity.current_status = CampaignStatus::Done;

        pulled.merge_local(&existing);
        let merged = pulled.primary_activity().unwrap();
        assert_eq!(merged.subject, "Hello");
        assert_eq!(merged.current_status, CampaignStatus::Done);
        assert!(merged.api_id.is_some());
        assert_eq!(pulled.stats.sends, 10);
    }
}
