//! Wire representations of Constant Contact v3 payloads.
//!
//! Field names match the vendor JSON exactly; a renamed key is silently
//! dropped by the API. Optional vendor values may be absent or `null`, and
//! both decode to the field's default.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Decode `null` as `T::default()`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Contacts ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteEmailAddress {
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_to_send: Option<String>,
    #[serde(default, skip_serializing)]
    pub opt_out_source: Option<String>,
    #[serde(default, skip_serializing)]
    pub opt_out_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub opt_out_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteContactCustomField {
    pub custom_field_id: Uuid,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemotePhoneNumber {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number_id: Option<Uuid>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteStreetAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address_id: Option<Uuid>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub street: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub postal_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteNote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<Uuid>,
    #[serde(default)]
    pub email_address: RemoteEmailAddress,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub job_title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_source: Option<String>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub list_memberships: Vec<Uuid>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_fields: Vec<RemoteContactCustomField>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone_numbers: Vec<RemotePhoneNumber>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub street_addresses: Vec<RemoteStreetAddress>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: Vec<RemoteNote>,
}

/// Body of `POST /contacts/sign_up_form`. Unlike the contact resource, the
/// email address is a bare string here.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpForm {
    pub email_address: String,
    pub first_name: String,
    pub last_name: String,
    pub job_title: String,
    pub company_name: String,
    pub list_memberships: Vec<Uuid>,
    pub custom_fields: Vec<RemoteContactCustomField>,
    pub phone_numbers: Vec<RemotePhoneNumber>,
    pub street_addresses: Vec<RemoteStreetAddress>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpFormResponse {
    pub contact_id: Uuid,
    /// `created` or `updated`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: String,
}

// ── Lists and custom fields ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteContactList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_id: Option<Uuid>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub favorite: bool,
    #[serde(default, skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteCustomField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_field_id: Option<Uuid>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    /// Derived from the label by the vendor.
    #[serde(default, skip_serializing, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub field_type: String,
    #[serde(default, skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

// ── Campaigns ─────────────────────────────────────────────────────────────

/// Reference to an activity inside a campaign response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteActivityRef {
    pub campaign_activity_id: Uuid,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteCampaign {
    pub campaign_id: Option<Uuid>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub current_status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub campaign_activities: Vec<RemoteActivityRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteActivity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_activity_id: Option<Uuid>,
    #[serde(default, skip_serializing)]
    pub campaign_id: Option<Uuid>,
    #[serde(default, skip_serializing)]
    pub role: Option<String>,
    #[serde(default, skip_serializing)]
    pub current_status: Option<String>,
    #[serde(default)]
    pub format_type: Option<u8>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub from_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub from_email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reply_to_email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subject: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub preheader: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub html_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_address_in_footer: Option<serde_json::Value>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub contact_list_ids: Vec<Uuid>,
}

/// Unique engagement counts. The vendor spells opt-outs `optouts`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct UniqueCounts {
    #[serde(default)]
    pub sends: i64,
    #[serde(default)]
    pub opens: i64,
    #[serde(default)]
    pub clicks: i64,
    #[serde(default)]
    pub forwards: i64,
    #[serde(default)]
    pub optouts: i64,
    #[serde(default)]
    pub abuse: i64,
    #[serde(default)]
    pub bounces: i64,
    #[serde(default)]
    pub not_opened: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteCampaignSummary {
    pub campaign_id: Uuid,
    #[serde(default)]
    pub unique_counts: Option<UniqueCounts>,
    #[serde(default)]
    pub last_sent_date: Option<DateTime<Utc>>,
}

// ── Bulk activities ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ContactIdsSource {
    pub contact_ids: Vec<Uuid>,
}

/// Body of the add/remove list membership activities.
#[derive(Debug, Clone, Serialize)]
pub struct ListMembershipActivity {
    pub source: ContactIdsSource,
    pub list_ids: Vec<Uuid>,
}

/// Accepted bulk activity.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityReceipt {
    pub activity_id: String,
    #[serde(default)]
    pub state: Option<String>,
}

// ── Campaign activity sub-resources ───────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct TestSend {
    pub email_addresses: Vec<String>,
    pub personal_message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Schedule {
    pub scheduled_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_contact_tolerates_nulls_and_absent_fields() {
        let contact: RemoteContact = serde_json::from_value(json!({
            "contact_id": "2b0d6b66-9c3a-11ec-b7e1-fa163e56c9b0",
            "email_address": {"address": "a@example.com", "opt_out_source": null},
            "first_name": null,
            "notes": null
        }))
        .unwrap();
        assert_eq!(contact.first_name, "");
        assert!(contact.notes.is_empty());
        assert!(contact.list_memberships.is_empty());
    }

    #[test]
    fn test_contact_serializes_vendor_keys() {
        let contact = RemoteContact {
            email_address: RemoteEmailAddress {
                address: "a@example.com".into(),
                permission_to_send: Some("implicit".into()),
                ..Default::default()
            },
            create_source: Some("Account".into()),
            custom_fields: vec![RemoteContactCustomField {
                custom_field_id: Uuid::nil(),
                value: "v".into(),
            }],
            ..Default::default()
        };
        let value = serde_json::to_value(&contact).unwrap();
        assert_eq!(value["email_address"]["address"], "a@example.com");
        assert_eq!(value["custom_fields"][0]["custom_field_id"], Uuid::nil().to_string());
        assert!(value.get("contact_id").is_none());
        assert!(value.get("created_at").is_none());
        assert!(value["email_address"].get("opt_out_source").is_none());
    }

    #[test]
    fn test_custom_field_type_key() {
        let field = RemoteCustomField {
            label: "Shirt size".into(),
            name: "shirt_size".into(),
            field_type: "string".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["type"], "string");
        assert!(value.get("name").is_none());
    }
}
