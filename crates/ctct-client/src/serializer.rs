//! Conversion between local records and vendor JSON.
//!
//! Outbound conversion applies the vendor field limits from the resource
//! descriptor before anything is sent. Inbound conversion cleans vendor
//! values and then validates the record against the local schema, so a value
//! the vendor accepts but local storage cannot hold surfaces as
//! [`CtctError::Validation`] instead of being silently cut.

use crate::error::{CtctError, CtctResult, FieldError};
use crate::models::{
    RemoteActivity, RemoteCampaign, RemoteCampaignSummary, RemoteContact,
    RemoteContactCustomField, RemoteContactList, RemoteCustomField, RemoteEmailAddress,
    RemoteNote, RemotePhoneNumber, RemoteStreetAddress, SignUpForm,
};
use crate::resource::{
    ResourceDescriptor, CAMPAIGN_ACTIVITIES, CONTACTS, CONTACT_LISTS, CUSTOM_FIELDS,
    EMAIL_CAMPAIGNS,
};
use ctct_core::{
    ActivityRole, CampaignActivity, CampaignStats, CampaignStatus, Contact, ContactCustomField,
    ContactList, ContactNote, CustomField, CustomFieldType, EmailCampaign, LocalId,
    PermissionToSend, PhoneKind, PhoneNumber, Record, RemoteId, Source, StreetAddress, StreetKind,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;
use validator::Validate;

/// Local ↔ remote id mapping for records referenced by other records
/// (list memberships, custom field values, activity recipients).
#[derive(Debug, Clone, Default)]
pub struct RemoteRefs {
    lists: IdMap,
    custom_fields: IdMap,
}

#[derive(Debug, Clone, Default)]
struct IdMap {
    to_remote: HashMap<LocalId, RemoteId>,
    to_local: HashMap<RemoteId, LocalId>,
}

impl IdMap {
    fn insert(&mut self, local: LocalId, remote: RemoteId) {
        self.to_remote.insert(local, remote);
        self.to_local.insert(remote, local);
    }
}

impl RemoteRefs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the mapping from every synced list and custom field.
    #[must_use]
    pub fn from_records(lists: &[ContactList], custom_fields: &[CustomField]) -> Self {
        let mut refs = Self::new();
        for list in lists {
            if let Some(remote) = list.api_id() {
                refs.insert_list(list.id(), remote);
            }
        }
        for field in custom_fields {
            if let Some(remote) = field.api_id() {
                refs.insert_custom_field(field.id(), remote);
            }
        }
        refs
    }

    pub fn insert_list(&mut self, local: LocalId, remote: RemoteId) {
        self.lists.insert(local, remote);
    }

    pub fn insert_custom_field(&mut self, local: LocalId, remote: RemoteId) {
        self.custom_fields.insert(local, remote);
    }

    #[must_use]
    pub fn remote_list(&self, local: LocalId) -> Option<RemoteId> {
        self.lists.to_remote.get(&local).copied()
    }

    #[must_use]
    pub fn local_list(&self, remote: RemoteId) -> Option<LocalId> {
        self.lists.to_local.get(&remote).copied()
    }

    #[must_use]
    pub fn remote_custom_field(&self, local: LocalId) -> Option<RemoteId> {
        self.custom_fields.to_remote.get(&local).copied()
    }

    #[must_use]
    pub fn local_custom_field(&self, remote: RemoteId) -> Option<LocalId> {
        self.custom_fields.to_local.get(&remote).copied()
    }

    /// Remote ids of the given local lists, skipping lists never pushed.
    fn remote_lists<'a>(
        &self,
        resource: &'static str,
        locals: impl IntoIterator<Item = &'a LocalId>,
    ) -> Vec<Uuid> {
        locals
            .into_iter()
            .filter_map(|local| match self.remote_list(*local) {
                Some(remote) => Some(*remote.as_uuid()),
                None => {
                    warn!(resource, list = %local, "Skipping list that does not exist remotely");
                    None
                }
            })
            .collect()
    }

    fn local_lists(&self, resource: &'static str, remotes: &[Uuid]) -> Vec<LocalId> {
        remotes
            .iter()
            .filter_map(|remote| {
                let local = self.local_list(RemoteId::from_uuid(*remote));
                if local.is_none() {
                    debug!(resource, list_id = %remote, "Ignoring unknown remote list");
                }
                local
            })
            .collect()
    }
}

/// A local record type that maps onto one vendor resource.
pub trait RemoteResource: Record + Validate {
    const DESCRIPTOR: &'static ResourceDescriptor;

    /// Body used to create the resource.
    fn to_remote(&self, refs: &RemoteRefs) -> CtctResult<Value>;

    /// Body used to update the resource.
    fn to_remote_update(&self, refs: &RemoteRefs) -> CtctResult<Value> {
        self.to_remote(refs)
    }

    /// Build a fresh local record (new local id) from a vendor object.
    fn from_remote(value: Value, refs: &RemoteRefs) -> CtctResult<Self>;
}

// ── Helpers ───────────────────────────────────────────────────────────────

fn decode<T: DeserializeOwned>(resource: &'static str, value: Value) -> CtctResult<T> {
    serde_json::from_value(value)
        .map_err(|e| CtctError::Parse(format!("invalid {resource} payload: {e}")))
}

fn remote_id(resource: &'static str, id: Option<Uuid>) -> CtctResult<RemoteId> {
    id.map(RemoteId::from_uuid)
        .ok_or_else(|| CtctError::Parse(format!("{resource} payload has no id")))
}

/// Validate an inbound record against local limits.
fn validate_inbound<R: Validate>(resource: &'static str, record: R) -> CtctResult<R> {
    record
        .validate()
        .map_err(|errors| CtctError::Validation(FieldError::inbound(resource, &errors)))?;
    Ok(record)
}

fn limited(desc: &ResourceDescriptor, field: &str, value: &str) -> Result<String, FieldError> {
    let mut value = value.to_string();
    desc.enforce(field, &mut value)?;
    Ok(value)
}

/// Remove line breaks and tabs the vendor sometimes stores in addresses.
#[must_use]
pub fn clean_remote_string(s: &str) -> String {
    s.replace(['\n', '\t'], " ").trim().to_string()
}

/// Keep only the digits of a vendor phone number.
#[must_use]
pub fn clean_remote_phone_number(s: &str) -> String {
    let digits: String = s.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        PhoneNumber::MISSING_NUMBER.to_string()
    } else {
        digits
    }
}

fn parse_status(resource: &'static str, status: Option<&str>) -> CampaignStatus {
    match status {
        None => CampaignStatus::None,
        Some(s) => s.parse().unwrap_or_else(|e| {
            warn!(resource, status = s, error = %e, "Unrecognized status, treating as NONE");
            CampaignStatus::None
        }),
    }
}

fn parse_source(s: Option<&str>) -> Option<Source> {
    match s {
        Some("Contact") => Some(Source::Contact),
        Some("Account") => Some(Source::Account),
        _ => None,
    }
}

fn parse_permission(s: Option<&str>) -> PermissionToSend {
    match s {
        Some("explicit") => PermissionToSend::Explicit,
        Some("not_set") => PermissionToSend::NotSet,
        Some("pending_confirmation") => PermissionToSend::PendingConfirmation,
        Some("temp_hold") => PermissionToSend::TempHold,
        Some("unsubscribed") => PermissionToSend::Unsubscribed,
        _ => PermissionToSend::Implicit,
    }
}

fn phone_kind(kind: &str) -> PhoneKind {
    match kind {
        "home" => PhoneKind::Home,
        "work" => PhoneKind::Work,
        "mobile" => PhoneKind::Mobile,
        _ => PhoneKind::Other,
    }
}

fn phone_kind_str(kind: PhoneKind) -> &'static str {
    match kind {
        PhoneKind::Home => "home",
        PhoneKind::Work => "work",
        PhoneKind::Mobile => "mobile",
        PhoneKind::Other => "other",
    }
}

fn street_kind(kind: &str) -> StreetKind {
    match kind {
        "work" => StreetKind::Work,
        "other" => StreetKind::Other,
        _ => StreetKind::Home,
    }
}

fn street_kind_str(kind: StreetKind) -> &'static str {
    match kind {
        StreetKind::Home => "home",
        StreetKind::Work => "work",
        StreetKind::Other => "other",
    }
}

// ── Contact lists ─────────────────────────────────────────────────────────

impl RemoteResource for ContactList {
    const DESCRIPTOR: &'static ResourceDescriptor = &CONTACT_LISTS;

    fn to_remote(&self, _refs: &RemoteRefs) -> CtctResult<Value> {
        let desc = Self::DESCRIPTOR;
        let body = RemoteContactList {
            list_id: None,
            name: limited(desc, "name", &self.name)?,
            description: limited(desc, "description", &self.description)?,
            favorite: self.favorite,
            created_at: None,
            updated_at: None,
        };
        Ok(serde_json::to_value(body)?)
    }

    fn from_remote(value: Value, _refs: &RemoteRefs) -> CtctResult<Self> {
        let remote: RemoteContactList = decode(Self::RESOURCE, value)?;
        let list = ContactList {
            id: LocalId::new(),
            api_id: Some(remote_id(Self::RESOURCE, remote.list_id)?),
            name: remote.name,
            description: remote.description,
            favorite: remote.favorite,
            created_at: remote.created_at,
            updated_at: remote.updated_at,
        };
        validate_inbound(Self::RESOURCE, list)
    }
}

// ── Custom fields ─────────────────────────────────────────────────────────

impl RemoteResource for CustomField {
    const DESCRIPTOR: &'static ResourceDescriptor = &CUSTOM_FIELDS;

    fn to_remote(&self, _refs: &RemoteRefs) -> CtctResult<Value> {
        let body = RemoteCustomField {
            label: limited(Self::DESCRIPTOR, "label", &self.label)?,
            field_type: match self.field_type {
                CustomFieldType::String => "string".into(),
                CustomFieldType::Date => "date".into(),
            },
            ..Default::default()
        };
        Ok(serde_json::to_value(body)?)
    }

    fn from_remote(value: Value, _refs: &RemoteRefs) -> CtctResult<Self> {
        let remote: RemoteCustomField = decode(Self::RESOURCE, value)?;
        let field = CustomField {
            id: LocalId::new(),
            api_id: Some(remote_id(Self::RESOURCE, remote.custom_field_id)?),
            label: remote.label,
            name: remote.name,
            field_type: if remote.field_type == "date" {
                CustomFieldType::Date
            } else {
                CustomFieldType::String
            },
            created_at: remote.created_at,
            updated_at: remote.updated_at,
        };
        validate_inbound(Self::RESOURCE, field)
    }
}

// ── Contacts ──────────────────────────────────────────────────────────────

/// Sub-objects shared by the contact body and the sign-up form body.
#[allow(clippy::type_complexity)]
fn contact_parts(
    contact: &Contact,
    refs: &RemoteRefs,
) -> CtctResult<(
    Vec<Uuid>,
    Vec<RemoteContactCustomField>,
    Vec<RemotePhoneNumber>,
    Vec<RemoteStreetAddress>,
)> {
    let desc = &CONTACTS;
    let lists = refs.remote_lists(Contact::RESOURCE, &contact.list_memberships);
    desc.enforce_count("list_memberships", lists.len())?;

    let mut custom_fields = Vec::with_capacity(contact.custom_fields.len());
    for value in &contact.custom_fields {
        match refs.remote_custom_field(value.custom_field) {
            Some(remote) => custom_fields.push(RemoteContactCustomField {
                custom_field_id: *remote.as_uuid(),
                value: limited(desc, "custom_fields.value", &value.value)?,
            }),
            None => warn!(
                custom_field = %value.custom_field,
                "Skipping custom field that does not exist remotely"
            ),
        }
    }
    desc.enforce_count("custom_fields", custom_fields.len())?;

    desc.enforce_count("phone_numbers", contact.phone_numbers.len())?;
    let phone_numbers = contact
        .phone_numbers
        .iter()
        .map(|p| {
            Ok(RemotePhoneNumber {
                phone_number_id: None,
                kind: phone_kind_str(p.kind).to_string(),
                phone_number: limited(desc, "phone_numbers.phone_number", &p.phone_number)?,
            })
        })
        .collect::<Result<Vec<_>, FieldError>>()?;

    desc.enforce_count("street_addresses", contact.street_addresses.len())?;
    let street_addresses = contact
        .street_addresses
        .iter()
        .map(|a| {
            Ok(RemoteStreetAddress {
                street_address_id: None,
                kind: street_kind_str(a.kind).to_string(),
                street: limited(desc, "street_addresses.street", &a.street)?,
                city: limited(desc, "street_addresses.city", &a.city)?,
                state: limited(desc, "street_addresses.state", &a.state)?,
                postal_code: limited(desc, "street_addresses.postal_code", &a.postal_code)?,
                country: limited(desc, "street_addresses.country", &a.country)?,
            })
        })
        .collect::<Result<Vec<_>, FieldError>>()?;

    Ok((lists, custom_fields, phone_numbers, street_addresses))
}

/// Body for `POST /contacts/sign_up_form`.
pub fn sign_up_form(contact: &Contact, refs: &RemoteRefs) -> CtctResult<SignUpForm> {
    let desc = &CONTACTS;
    let (list_memberships, custom_fields, phone_numbers, street_addresses) =
        contact_parts(contact, refs)?;
    if list_memberships.is_empty() {
        return Err(CtctError::Validation(FieldError {
            resource: Contact::RESOURCE,
            field: "list_memberships".into(),
            direction: crate::error::Direction::Outbound,
            detail: "sign-up form requires at least one synced list".into(),
        }));
    }
    Ok(SignUpForm {
        email_address: limited(desc, "email_address.address", &contact.email)?,
        first_name: limited(desc, "first_name", &contact.first_name)?,
        last_name: limited(desc, "last_name", &contact.last_name)?,
        job_title: limited(desc, "job_title", &contact.job_title)?,
        company_name: limited(desc, "company_name", &contact.company_name)?,
        list_memberships,
        custom_fields,
        phone_numbers,
        street_addresses,
    })
}

impl RemoteResource for Contact {
    const DESCRIPTOR: &'static ResourceDescriptor = &CONTACTS;

    fn to_remote(&self, refs: &RemoteRefs) -> CtctResult<Value> {
        let desc = Self::DESCRIPTOR;
        let (list_memberships, custom_fields, phone_numbers, street_addresses) =
            contact_parts(self, refs)?;

        desc.enforce_count("notes", self.notes.len())?;
        let notes = self
            .notes
            .iter()
            .map(|n| {
                Ok(RemoteNote {
                    note_id: n.api_id.map(|id| *id.as_uuid()),
                    created_at: n.created_at,
                    content: limited(desc, "notes.content", &n.content)?,
                })
            })
            .collect::<Result<Vec<_>, FieldError>>()?;

        let (source_field, source) = self.write_source();
        let body = RemoteContact {
            contact_id: None,
            email_address: RemoteEmailAddress {
                address: limited(desc, "email_address.address", &self.email)?,
                permission_to_send: Some(self.permission_to_send.as_str().to_string()),
                ..Default::default()
            },
            first_name: limited(desc, "first_name", &self.first_name)?,
            last_name: limited(desc, "last_name", &self.last_name)?,
            job_title: limited(desc, "job_title", &self.job_title)?,
            company_name: limited(desc, "company_name", &self.company_name)?,
            create_source: (source_field == "create_source").then(|| source.as_str().into()),
            update_source: (source_field == "update_source").then(|| source.as_str().into()),
            created_at: None,
            updated_at: None,
            list_memberships,
            custom_fields,
            phone_numbers,
            street_addresses,
            notes,
        };
        Ok(serde_json::to_value(body)?)
    }

    fn from_remote(value: Value, refs: &RemoteRefs) -> CtctResult<Self> {
        let remote: RemoteContact = decode(Self::RESOURCE, value)?;
        let email = remote.email_address;

        let custom_fields = remote
            .custom_fields
            .iter()
            .filter_map(|cf| {
                let local = refs.local_custom_field(RemoteId::from_uuid(cf.custom_field_id));
                if local.is_none() {
                    debug!(custom_field_id = %cf.custom_field_id, "Ignoring unknown custom field");
                }
                local.map(|custom_field| ContactCustomField {
                    custom_field,
                    value: cf.value.clone(),
                })
            })
            .collect();

        let contact = Contact {
            id: LocalId::new(),
            api_id: Some(remote_id(Self::RESOURCE, remote.contact_id)?),
            email: email.address.trim().to_lowercase(),
            first_name: remote.first_name,
            last_name: remote.last_name,
            job_title: remote.job_title,
            company_name: remote.company_name,
            honorific: String::new(),
            suffix: String::new(),
            permission_to_send: parse_permission(email.permission_to_send.as_deref()),
            create_source: parse_source(remote.create_source.as_deref()).unwrap_or_default(),
            update_source: parse_source(remote.update_source.as_deref()).unwrap_or_default(),
            opt_out_source: parse_source(email.opt_out_source.as_deref()),
            opt_out_date: email.opt_out_date,
            opt_out_reason: email.opt_out_reason.filter(|r| !r.is_empty()),
            list_memberships: refs
                .local_lists(Self::RESOURCE, &remote.list_memberships)
                .into_iter()
                .collect(),
            custom_fields,
            phone_numbers: remote
                .phone_numbers
                .into_iter()
                .map(|p| PhoneNumber {
                    api_id: p.phone_number_id.map(RemoteId::from_uuid),
                    kind: phone_kind(&p.kind),
                    phone_number: clean_remote_phone_number(&p.phone_number),
                })
                .collect(),
            street_addresses: remote
                .street_addresses
                .into_iter()
                .map(|a| StreetAddress {
                    api_id: a.street_address_id.map(RemoteId::from_uuid),
                    kind: street_kind(&a.kind),
                    street: clean_remote_string(&a.street),
                    city: clean_remote_string(&a.city),
                    state: clean_remote_string(&a.state),
                    postal_code: clean_remote_string(&a.postal_code),
                    country: clean_remote_string(&a.country),
                })
                .collect(),
            notes: remote
                .notes
                .into_iter()
                .map(|n| ContactNote {
                    api_id: n.note_id.map(RemoteId::from_uuid),
                    content: n.content,
                    created_at: n.created_at,
                })
                .collect(),
            created_at: remote.created_at,
            updated_at: remote.updated_at,
        };
        validate_inbound(Self::RESOURCE, contact)
    }
}

// ── Campaign activities ───────────────────────────────────────────────────

fn activity_body(
    activity: &CampaignActivity,
    refs: &RemoteRefs,
    with_lists: bool,
) -> CtctResult<RemoteActivity> {
    let desc = &CAMPAIGN_ACTIVITIES;
    Ok(RemoteActivity {
        format_type: Some(activity.format_type),
        from_name: limited(desc, "from_name", &activity.from_name)?,
        from_email: limited(desc, "from_email", &activity.from_email)?,
        reply_to_email: limited(desc, "reply_to_email", &activity.reply_to_email)?,
        subject: limited(desc, "subject", &activity.subject)?,
        preheader: limited(desc, "preheader", &activity.preheader)?,
        html_content: limited(desc, "html_content", &activity.html_content)?,
        physical_address_in_footer: activity.physical_address_in_footer.clone(),
        contact_list_ids: if with_lists {
            refs.remote_lists(CampaignActivity::RESOURCE, &activity.contact_lists)
        } else {
            Vec::new()
        },
        ..Default::default()
    })
}

impl RemoteResource for CampaignActivity {
    const DESCRIPTOR: &'static ResourceDescriptor = &CAMPAIGN_ACTIVITIES;

    /// Body embedded in the campaign create request. Recipients can only be
    /// set once the activity exists.
    fn to_remote(&self, refs: &RemoteRefs) -> CtctResult<Value> {
        Ok(serde_json::to_value(activity_body(self, refs, false)?)?)
    }

    fn to_remote_update(&self, refs: &RemoteRefs) -> CtctResult<Value> {
        let mut body = activity_body(self, refs, self.api_id.is_some())?;
        body.campaign_activity_id = self.api_id.map(|id| *id.as_uuid());
        let mut value = serde_json::to_value(body)?;
        if let Value::Object(map) = &mut value {
            map.insert("role".into(), Value::String(self.role.as_str().into()));
        }
        Ok(value)
    }

    fn from_remote(value: Value, refs: &RemoteRefs) -> CtctResult<Self> {
        let remote: RemoteActivity = decode(Self::RESOURCE, value)?;
        let role = remote
            .role
            .as_deref()
            .map(str::parse::<ActivityRole>)
            .transpose()
            .map_err(CtctError::Parse)?
            .unwrap_or_default();

        let activity = CampaignActivity {
            id: LocalId::new(),
            api_id: Some(remote_id(Self::RESOURCE, remote.campaign_activity_id)?),
            role,
            current_status: parse_status(Self::RESOURCE, remote.current_status.as_deref()),
            from_name: remote.from_name,
            from_email: remote.from_email,
            reply_to_email: remote.reply_to_email,
            subject: remote.subject,
            preheader: remote.preheader,
            html_content: remote.html_content,
            contact_lists: refs.local_lists(Self::RESOURCE, &remote.contact_list_ids),
            physical_address_in_footer: remote.physical_address_in_footer,
            format_type: remote
                .format_type
                .unwrap_or(CampaignActivity::MODERN_CUSTOM_CODE),
        };
        validate_inbound(Self::RESOURCE, activity)
    }
}

// ── Email campaigns ───────────────────────────────────────────────────────

impl RemoteResource for EmailCampaign {
    const DESCRIPTOR: &'static ResourceDescriptor = &EMAIL_CAMPAIGNS;

    /// Create body: the name plus the primary email activity.
    fn to_remote(&self, refs: &RemoteRefs) -> CtctResult<Value> {
        let name = limited(Self::DESCRIPTOR, "name", &self.name)?;
        let activity = self.primary_activity().ok_or_else(|| {
            CtctError::Unsupported(format!("campaign '{}' has no primary_email activity", self.name))
        })?;
        Ok(json!({
            "name": name,
            "email_campaign_activities": [activity.to_remote(refs)?],
        }))
    }

    /// Only the name of an existing campaign can be changed.
    fn to_remote_update(&self, _refs: &RemoteRefs) -> CtctResult<Value> {
        Ok(json!({ "name": limited(Self::DESCRIPTOR, "name", &self.name)? }))
    }

    /// Activities come back as id/role stubs; their content is fetched
    /// separately.
    fn from_remote(value: Value, _refs: &RemoteRefs) -> CtctResult<Self> {
        let remote: RemoteCampaign = decode(Self::RESOURCE, value)?;
        let status = parse_status(Self::RESOURCE, remote.current_status.as_deref());
        let mut activities = Vec::with_capacity(remote.campaign_activities.len());
        for stub in remote.campaign_activities {
            let role = match stub.role.parse::<ActivityRole>() {
                Ok(role) => role,
                Err(e) => {
                    debug!(error = %e, "Skipping activity with unknown role");
                    continue;
                }
            };
            let mut activity = CampaignActivity::new(role);
            activity.api_id = Some(RemoteId::from_uuid(stub.campaign_activity_id));
            activity.current_status = status;
            activities.push(activity);
        }

        let campaign = EmailCampaign {
            id: LocalId::new(),
            api_id: Some(remote_id(Self::RESOURCE, remote.campaign_id)?),
            name: remote.name,
            current_status: status,
            scheduled_datetime: None,
            stats: CampaignStats::default(),
            activities,
            created_at: remote.created_at,
            updated_at: remote.updated_at,
        };
        validate_inbound(Self::RESOURCE, campaign)
    }
}

/// Apply a summary report entry. A campaign with counts has been sent.
pub fn apply_summary(campaign: &mut EmailCampaign, summary: &RemoteCampaignSummary) {
    if let Some(counts) = summary.unique_counts {
        campaign.stats = CampaignStats {
            sends: counts.sends,
            opens: counts.opens,
            clicks: counts.clicks,
            forwards: counts.forwards,
            opt_outs: counts.optouts,
            abuse: counts.abuse,
            bounces: counts.bounces,
            not_opened: counts.not_opened,
        };
        campaign.observe(CampaignStatus::Done);
    }
}

/// Extract the vendor id of any resource payload.
pub fn extract_remote_id(desc: &ResourceDescriptor, value: &Value) -> CtctResult<RemoteId> {
    value
        .get(desc.id_label)
        .and_then(Value::as_str)
        .ok_or_else(|| CtctError::Parse(format!("{} payload has no {}", desc.name, desc.id_label)))?
        .parse::<RemoteId>()
        .map_err(|e| CtctError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs_with_list() -> (RemoteRefs, LocalId, RemoteId) {
        let mut refs = RemoteRefs::new();
        let local = LocalId::new();
        let remote = RemoteId::new();
        refs.insert_list(local, remote);
        (refs, local, remote)
    }

    #[test]
    fn test_campaign_name_over_vendor_limit_rejected() {
        let campaign = EmailCampaign::new("x".repeat(81));
        let err = campaign.to_remote(&RemoteRefs::new()).unwrap_err();
        match err {
            CtctError::Validation(e) => {
                assert_eq!(e.field, "name");
                assert_eq!(e.resource, "email campaign");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(campaign.to_remote_update(&RemoteRefs::new()).is_err());
    }

    #[test]
    fn test_campaign_create_body_shape() {
        let mut campaign = EmailCampaign::new("Spring");
        let activity = campaign.primary_activity_mut().unwrap();
        activity.subject = "Hello".into();
        activity.from_email = "news@example.com".into();

        let body = campaign.to_remote(&RemoteRefs::new()).unwrap();
        assert_eq!(body["name"], "Spring");
        let activity = &body["email_campaign_activities"][0];
        assert_eq!(activity["subject"], "Hello");
        assert_eq!(activity["format_type"], 5);
        assert!(activity.get("contact_list_ids").is_none());

        let update = campaign.to_remote_update(&RemoteRefs::new()).unwrap();
        assert_eq!(update, json!({"name": "Spring"}));
    }

    #[test]
    fn test_contact_body_nested_keys() {
        let (refs, list, remote_list) = refs_with_list();
        let mut contact = Contact::new("a@example.com").with_name("Ada", "L").with_list(list);
        contact.phone_numbers.push(PhoneNumber::new(PhoneKind::Mobile, "5551234"));

        let body = contact.to_remote(&refs).unwrap();
        assert_eq!(body["email_address"]["address"], "a@example.com");
        assert_eq!(body["email_address"]["permission_to_send"], "implicit");
        assert_eq!(body["list_memberships"], json!([remote_list.to_string()]));
        assert_eq!(body["phone_numbers"][0]["kind"], "mobile");
        assert_eq!(body["create_source"], "Account");
        assert!(body.get("update_source").is_none());
    }

    #[test]
    fn test_contact_unsynced_list_skipped() {
        let contact = Contact::new("a@example.com").with_list(LocalId::new());
        let body = contact.to_remote(&RemoteRefs::new()).unwrap();
        assert_eq!(body["list_memberships"], json!([]));
    }

    #[test]
    fn test_contact_too_many_phone_numbers() {
        let mut contact = Contact::new("a@example.com");
        for _ in 0..4 {
            contact.phone_numbers.push(PhoneNumber::new(PhoneKind::Home, "1"));
        }
        assert!(matches!(
            contact.to_remote(&RemoteRefs::new()),
            Err(CtctError::Validation(_))
        ));
    }

    #[test]
    fn test_contact_from_remote_cleans_values() {
        let (refs, list, remote_list) = refs_with_list();
        let value = json!({
            "contact_id": "0a3b5f5e-6f4c-11ee-b962-0242ac120002",
            "email_address": {
                "address": "Jane@Example.com",
                "permission_to_send": "explicit",
                "opt_out_source": null
            },
            "first_name": "Jane",
            "last_name": null,
            "list_memberships": [remote_list.to_string(), "8f0c3a8e-0000-0000-0000-000000000000"],
            "phone_numbers": [{"phone_number_id": null, "kind": "work", "phone_number": "(555) 123-4567"}],
            "street_addresses": [{"kind": "home", "street": "1 Main St\n\tApt 2 ", "city": "Springfield"}]
        });

        let contact = Contact::from_remote(value, &refs).unwrap();
        assert_eq!(contact.email, "jane@example.com");
        assert_eq!(contact.last_name, "");
        assert_eq!(contact.permission_to_send, PermissionToSend::Explicit);
        assert_eq!(contact.list_memberships.len(), 1);
        assert!(contact.list_memberships.contains(&list));
        assert_eq!(contact.phone_numbers[0].phone_number, "5551234567");
        assert_eq!(contact.street_addresses[0].street, "1 Main St  Apt 2");
        assert!(!contact.opted_out());
    }

    #[test]
    fn test_activity_preheader_exceeding_local_limit_rejected_inbound() {
        let value = json!({
            "campaign_activity_id": "0a3b5f5e-6f4c-11ee-b962-0242ac120002",
            "role": "primary_email",
            "current_status": "DRAFT",
            "preheader": "p".repeat(200)
        });
        let err = CampaignActivity::from_remote(value, &RemoteRefs::new()).unwrap_err();
        match err {
            CtctError::Validation(e) => {
                assert_eq!(e.direction, crate::error::Direction::Inbound);
                assert!(e.field.contains("preheader"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_activity_update_includes_recipients() {
        let (refs, list, remote_list) = refs_with_list();
        let mut activity = CampaignActivity::new(ActivityRole::PrimaryEmail);
        activity.contact_lists.push(list);
        assert!(activity.to_remote_update(&refs).unwrap().get("contact_list_ids").is_none());

        activity.api_id = Some(RemoteId::new());
        let body = activity.to_remote_update(&refs).unwrap();
        assert_eq!(body["contact_list_ids"], json!([remote_list.to_string()]));
        assert_eq!(body["role"], "primary_email");
    }

    #[test]
    fn test_campaign_from_remote_stubs() {
        let value = json!({
            "campaign_id": "0a3b5f5e-6f4c-11ee-b962-0242ac120002",
            "name": "Spring",
            "current_status": "Draft",
            "campaign_activities": [
                {"campaign_activity_id": "1b3b5f5e-6f4c-11ee-b962-0242ac120002", "role": "primary_email"},
                {"campaign_activity_id": "2c3b5f5e-6f4c-11ee-b962-0242ac120002", "role": "permalink"}
            ]
        });
        let campaign = EmailCampaign::from_remote(value, &RemoteRefs::new()).unwrap();
        assert_eq!(campaign.current_status, CampaignStatus::Draft);
        assert_eq!(campaign.activities.len(), 2);
        assert!(campaign.primary_activity().unwrap().api_id.is_some());
    }

    #[test]
    fn test_apply_summary_marks_done() {
        let mut campaign = EmailCampaign::new("Spring");
        let summary: RemoteCampaignSummary = serde_json::from_value(json!({
            "campaign_id": "0a3b5f5e-6f4c-11ee-b962-0242ac120002",
            "unique_counts": {"sends": 10, "opens": 4, "optouts": 1}
        }))
        .unwrap();
        apply_summary(&mut campaign, &summary);
        assert_eq!(campaign.current_status, CampaignStatus::Done);
        assert_eq!(campaign.stats.sends, 10);
        assert_eq!(campaign.stats.opt_outs, 1);
        assert_eq!(campaign.stats.clicks, 0);
    }

    #[test]
    fn test_missing_id_is_parse_error() {
        let err = ContactList::from_remote(json!({"name": "x"}), &RemoteRefs::new()).unwrap_err();
        assert!(matches!(err, CtctError::Parse(_)));
    }

    #[test]
    fn test_extract_remote_id() {
        let id = RemoteId::new();
        let value = json!({"list_id": id.to_string()});
        assert_eq!(extract_remote_id(&CONTACT_LISTS, &value).unwrap(), id);
    }
}
