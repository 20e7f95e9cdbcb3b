//! Account-level custom field definitions.

use crate::ids::{LocalId, RemoteId};
use crate::record::impl_record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Value type of a custom field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomFieldType {
    #[default]
    String,
    Date,
}

/// A custom field that contacts can carry values for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CustomField {
    pub id: LocalId,
    pub api_id: Option<RemoteId>,

    /// Display name shown in the vendor UI.
    #[validate(length(min = 1, max = 50, message = "Label must be 1-50 characters"))]
    pub label: String,

    /// Unique name derived by the vendor from the label. Read-only.
    #[validate(length(max = 50))]
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub field_type: CustomFieldType,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl_record!(CustomField, "custom field");

impl CustomField {
    #[must_use]
    pub fn new(label: impl Into<String>, field_type: CustomFieldType) -> Self {
        Self {
            id: LocalId::new(),
            api_id: None,
            label: label.into(),
            name: String::new(),
            field_type,
            created_at: None,
            updated_at: None,
        }
    }
}
