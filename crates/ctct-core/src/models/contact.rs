//! Contact record and its owned sub-objects.

use crate::ids::{LocalId, RemoteId};
use crate::record::impl_record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

/// Consent state for sending email to a contact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionToSend {
    Explicit,
    #[default]
    Implicit,
    NotSet,
    PendingConfirmation,
    TempHold,
    Unsubscribed,
}

impl PermissionToSend {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Implicit => "implicit",
            Self::NotSet => "not_set",
            Self::PendingConfirmation => "pending_confirmation",
            Self::TempHold => "temp_hold",
            Self::Unsubscribed => "unsubscribed",
        }
    }
}

/// Who performed a create, update or opt-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// The contact acted on their own behalf.
    Contact,
    /// The account owner acted on the contact.
    #[default]
    Account,
}

impl Source {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contact => "Contact",
            Self::Account => "Account",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhoneKind {
    Home,
    Work,
    Mobile,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreetKind {
    #[default]
    Home,
    Work,
    Other,
}

/// A free-text note attached to a contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ContactNote {
    pub api_id: Option<RemoteId>,
    #[validate(length(min = 1, max = 2000, message = "Note must be 1-2000 characters"))]
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl ContactNote {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            api_id: None,
            content: content.into(),
            created_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PhoneNumber {
    pub api_id: Option<RemoteId>,
    pub kind: PhoneKind,
    #[validate(length(min = 1, max = 25))]
    pub phone_number: String,
}

impl PhoneNumber {
    /// Stored when the vendor hands back a number without any digits.
    pub const MISSING_NUMBER: &'static str = "000-000-0000";

    #[must_use]
    pub fn new(kind: PhoneKind, phone_number: impl Into<String>) -> Self {
        Self {
            api_id: None,
            kind,
            phone_number: phone_number.into(),
        }
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.phone_number)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct StreetAddress {
    pub api_id: Option<RemoteId>,
    pub kind: StreetKind,
    #[validate(length(max = 255))]
    pub street: String,
    #[validate(length(max = 50))]
    pub city: String,
    #[validate(length(max = 50))]
    pub state: String,
    #[validate(length(max = 50))]
    pub postal_code: String,
    #[validate(length(max = 50))]
    pub country: String,
}

/// A contact's value for one account-level [`CustomField`](super::CustomField).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ContactCustomField {
    /// Local id of the field definition.
    pub custom_field: LocalId,
    #[validate(length(max = 255, message = "Custom field value must be at most 255 characters"))]
    pub value: String,
}

/// A Constant Contact contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Contact {
    pub id: LocalId,
    pub api_id: Option<RemoteId>,

    #[validate(email(message = "Invalid email address"), length(max = 254))]
    pub email: String,

    #[validate(length(max = 50))]
    #[serde(default)]
    pub first_name: String,
    #[validate(length(max = 50))]
    #[serde(default)]
    pub last_name: String,
    #[validate(length(max = 50))]
    #[serde(default)]
    pub job_title: String,
    #[validate(length(max = 50))]
    #[serde(default)]
    pub company_name: String,
    #[validate(length(max = 5))]
    #[serde(default)]
    pub honorific: String,
    #[validate(length(max = 10))]
    #[serde(default)]
    pub suffix: String,

    #[serde(default)]
    pub permission_to_send: PermissionToSend,
    #[serde(default)]
    pub create_source: Source,
    #[serde(default)]
    pub update_source: Source,

    pub opt_out_source: Option<Source>,
    pub opt_out_date: Option<DateTime<Utc>>,
    #[validate(length(max = 255))]
    pub opt_out_reason: Option<String>,

    /// Local ids of the lists this contact belongs to.
    #[serde(default)]
    pub list_memberships: BTreeSet<LocalId>,

    #[validate(nested)]
    #[serde(default)]
    pub custom_fields: Vec<ContactCustomField>,
    #[validate(nested)]
    #[serde(default)]
    pub phone_numbers: Vec<PhoneNumber>,
    #[validate(nested)]
    #[serde(default)]
    pub street_addresses: Vec<StreetAddress>,
    #[validate(nested)]
    #[serde(default)]
    pub notes: Vec<ContactNote>,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl_record!(Contact, "contact");

impl Contact {
    /// A new, not yet synced, contact. The address is normalized.
    #[must_use]
    pub fn new(email: impl AsRef<str>) -> Self {
        Self {
            id: LocalId::new(),
            api_id: None,
            email: normalize_email(email.as_ref()),
            first_name: String::new(),
            last_name: String::new(),
            job_title: String::new(),
            company_name: String::new(),
            honorific: String::new(),
            suffix: String::new(),
            permission_to_send: PermissionToSend::default(),
            create_source: Source::default(),
            update_source: Source::default(),
            opt_out_source: None,
            opt_out_date: None,
            opt_out_reason: None,
            list_memberships: BTreeSet::new(),
            custom_fields: Vec::new(),
            phone_numbers: Vec::new(),
            street_addresses: Vec::new(),
            notes: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    #[must_use]
    pub fn with_list(mut self, list: LocalId) -> Self {
        self.list_memberships.insert(list);
        self
    }

    /// Honorific, first name, last name and suffix joined by spaces.
    #[must_use]
    pub fn display_name(&self) -> String {
        [
            self.honorific.as_str(),
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.suffix.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// "Title @ Company", skipping whichever is blank.
    #[must_use]
    pub fn job(&self) -> String {
        [self.job_title.as_str(), self.company_name.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" @ ")
    }

    /// Contacts with an opt-out source have unsubscribed and must not be
    /// pushed list changes.
    #[must_use]
    pub fn opted_out(&self) -> bool {
        self.opt_out_source.is_some()
    }

    /// Source field the vendor expects for the next write.
    #[must_use]
    pub fn write_source(&self) -> (&'static str, Source) {
        if self.api_id.is_some() {
            ("update_source", self.update_source)
        } else {
            ("create_source", self.create_source)
        }
    }

    /// Trim and lower-case the email address in place.
    pub fn normalize(&mut self) {
        self.email = normalize_email(&self.email);
    }
}

impl std::fmt::Display for Contact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.display_name();
        match (name.is_empty(), self.email.is_empty()) {
            (false, false) => write!(f, "{name} ({})", self.email),
            (true, false) => f.write_str(&self.email),
            (false, true) => f.write_str(&name),
            (true, true) => f.write_str("N/A"),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
