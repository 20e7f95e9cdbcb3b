//! Static description of each Constant Contact resource.
//!
//! A [`ResourceDescriptor`] is the single place that knows where a resource
//! lives, what its id is called, which verbs it supports and how long each
//! field may be on the vendor side.

use crate::error::{CtctError, CtctResult, FieldError};
use reqwest::Method;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Contact,
    ContactList,
    CustomField,
    EmailCampaign,
    CampaignActivity,
    CampaignSummary,
}

/// What happens to a value longer than the vendor allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitPolicy {
    /// Fail before sending anything.
    Reject,
    /// Cut the value at the limit and log a warning.
    Truncate,
}

/// Vendor maximum for one string field.
#[derive(Debug, Clone, Copy)]
pub struct FieldLimit {
    pub field: &'static str,
    pub max: usize,
    pub policy: LimitPolicy,
}

const fn reject(field: &'static str, max: usize) -> FieldLimit {
    FieldLimit {
        field,
        max,
        policy: LimitPolicy::Reject,
    }
}

const fn truncate(field: &'static str, max: usize) -> FieldLimit {
    FieldLimit {
        field,
        max,
        policy: LimitPolicy::Truncate,
    }
}

/// Vendor maximum for a repeated sub-object.
#[derive(Debug, Clone, Copy)]
pub struct CountLimit {
    pub field: &'static str,
    pub max: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Verbs {
    pub list: bool,
    pub get: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

const ALL_VERBS: Verbs = Verbs {
    list: true,
    get: true,
    create: true,
    update: true,
    delete: true,
};

#[derive(Debug)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    /// Name used in logs and errors.
    pub name: &'static str,
    /// Path below the API root.
    pub endpoint: &'static str,
    /// Key of the id in vendor JSON.
    pub id_label: &'static str,
    /// Key holding the items of a list response.
    pub list_key: &'static str,
    pub verbs: Verbs,
    pub update_method: UpdateMethod,
    /// Largest `limit` the vendor accepts on list calls.
    pub max_page_size: Option<u32>,
    /// Query parameters sent on every GET.
    pub get_queries: &'static [(&'static str, &'static str)],
    pub field_limits: &'static [FieldLimit],
    pub count_limits: &'static [CountLimit],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMethod {
    Put,
    Patch,
}

impl UpdateMethod {
    #[must_use]
    pub fn as_method(self) -> Method {
        match self {
            Self::Put => Method::PUT,
            Self::Patch => Method::PATCH,
        }
    }
}

pub static CONTACTS: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::Contact,
    name: "contact",
    endpoint: "/contacts",
    id_label: "contact_id",
    list_key: "contacts",
    verbs: ALL_VERBS,
    update_method: UpdateMethod::Put,
    max_page_size: Some(500),
    get_queries: &[(
        "include",
        "custom_fields,list_memberships,notes,phone_numbers,street_addresses",
    )],
    field_limits: &[
        reject("email_address.address", 80),
        reject("first_name", 50),
        reject("last_name", 50),
        reject("job_title", 50),
        reject("company_name", 50),
        reject("notes.content", 2000),
        reject("phone_numbers.phone_number", 25),
        reject("street_addresses.street", 255),
        reject("street_addresses.city", 50),
        reject("street_addresses.state", 50),
        reject("street_addresses.postal_code", 50),
        reject("street_addresses.country", 50),
        reject("custom_fields.value", 255),
    ],
    count_limits: &[
        CountLimit {
            field: "notes",
            max: 150,
        },
        CountLimit {
            field: "phone_numbers",
            max: 3,
        },
        CountLimit {
            field: "street_addresses",
            max: 3,
        },
        CountLimit {
            field: "custom_fields",
            max: 25,
        },
        CountLimit {
            field: "list_memberships",
            max: 50,
        },
    ],
};

pub static CONTACT_LISTS: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::ContactList,
    name: "contact list",
    endpoint: "/contact_lists",
    id_label: "list_id",
    list_key: "lists",
    verbs: ALL_VERBS,
    update_method: UpdateMethod::Put,
    max_page_size: Some(1000),
    get_queries: &[],
    field_limits: &[reject("name", 255), truncate("description", 255)],
    count_limits: &[],
};

pub static CUSTOM_FIELDS: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::CustomField,
    name: "custom field",
    endpoint: "/contact_custom_fields",
    id_label: "custom_field_id",
    list_key: "custom_fields",
    verbs: ALL_VERBS,
    update_method: UpdateMethod::Put,
    max_page_size: Some(100),
    get_queries: &[],
    field_limits: &[reject("label", 50)],
    count_limits: &[],
};

pub static EMAIL_CAMPAIGNS: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::EmailCampaign,
    name: "email campaign",
    endpoint: "/emails",
    id_label: "campaign_id",
    list_key: "campaigns",
    verbs: ALL_VERBS,
    update_method: UpdateMethod::Patch,
    max_page_size: Some(500),
    get_queries: &[],
    field_limits: &[reject("name", 80)],
    count_limits: &[],
};

/// Activities are created by the vendor together with their campaign.
pub static CAMPAIGN_ACTIVITIES: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::CampaignActivity,
    name: "campaign activity",
    endpoint: "/emails/activities",
    id_label: "campaign_activity_id",
    list_key: "campaign_activities",
    verbs: Verbs {
        list: false,
        get: true,
        create: false,
        update: true,
        delete: false,
    },
    update_method: UpdateMethod::Put,
    max_page_size: None,
    get_queries: &[("include", "html_content")],
    field_limits: &[
        reject("from_name", 100),
        reject("from_email", 80),
        reject("reply_to_email", 80),
        reject("subject", 200),
        reject("preheader", 330),
        reject("html_content", 150_000),
    ],
    count_limits: &[],
};

pub static CAMPAIGN_SUMMARIES: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::CampaignSummary,
    name: "campaign summary",
    endpoint: "/reports/summary_reports/email_campaign_summaries",
    id_label: "campaign_id",
    list_key: "bulk_email_campaign_summaries",
    verbs: Verbs {
        list: true,
        get: false,
        create: false,
        update: false,
        delete: false,
    },
    update_method: UpdateMethod::Put,
    max_page_size: Some(500),
    get_queries: &[],
    field_limits: &[],
    count_limits: &[],
};

/// Bulk membership endpoints and their per-call cap.
pub const ADD_LIST_MEMBERSHIPS: &str = "/activities/add_list_memberships";
pub const REMOVE_LIST_MEMBERSHIPS: &str = "/activities/remove_list_memberships";
pub const MEMBERSHIP_BATCH_SIZE: usize = 500;

/// Contact update-or-create keyed on email address.
pub const SIGN_UP_FORM: &str = "/contacts/sign_up_form";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl ResourceDescriptor {
    #[must_use]
    pub fn for_kind(kind: ResourceKind) -> &'static ResourceDescriptor {
        match kind {
            ResourceKind::Contact => &CONTACTS,
            ResourceKind::ContactList => &CONTACT_LISTS,
            ResourceKind::CustomField => &CUSTOM_FIELDS,
            ResourceKind::EmailCampaign => &EMAIL_CAMPAIGNS,
            ResourceKind::CampaignActivity => &CAMPAIGN_ACTIVITIES,
            ResourceKind::CampaignSummary => &CAMPAIGN_SUMMARIES,
        }
    }

    /// Fail with [`CtctError::Unsupported`] unless `verb` is supported.
    pub fn require(&self, verb: Verb) -> CtctResult<()> {
        let supported = match verb {
            Verb::List => self.verbs.list,
            Verb::Get => self.verbs.get,
            Verb::Create => self.verbs.create,
            Verb::Update => self.verbs.update,
            Verb::Delete => self.verbs.delete,
        };
        if supported {
            Ok(())
        } else {
            Err(CtctError::Unsupported(format!(
                "{verb:?} is not supported for {}",
                self.name
            )))
        }
    }

    /// Path of a single resource, optionally with a sub-resource suffix.
    #[must_use]
    pub fn item_path(&self, id: &impl std::fmt::Display, suffix: Option<&str>) -> String {
        format!("{}/{id}{}", self.endpoint, suffix.unwrap_or(""))
    }

    #[must_use]
    pub fn field_limit(&self, field: &str) -> Option<&FieldLimit> {
        self.field_limits.iter().find(|l| l.field == field)
    }

    /// Apply the vendor limit for `field` to `value`.
    ///
    /// Fields without a limit pass through unchanged. Lengths are counted in
    /// characters.
    pub fn enforce(&self, field: &str, value: &mut String) -> Result<(), FieldError> {
        let Some(limit) = self.field_limit(field) else {
            return Ok(());
        };
        let actual = value.chars().count();
        if actual <= limit.max {
            return Ok(());
        }
        match limit.policy {
            LimitPolicy::Reject => Err(FieldError::too_long(self.name, field, limit.max, actual)),
            LimitPolicy::Truncate => {
                warn!(
                    resource = self.name,
                    field,
                    max = limit.max,
                    actual,
                    "Truncating value to vendor limit"
                );
                *value = value.chars().take(limit.max).collect();
                Ok(())
            }
        }
    }

    /// Check a repeated sub-object against its vendor cap.
    pub fn enforce_count(&self, field: &str, actual: usize) -> Result<(), FieldError> {
        match self.count_limits.iter().find(|l| l.field == field) {
            Some(limit) if actual > limit.max => {
                Err(FieldError::too_many(self.name, field, limit.max, actual))
            }
            _ => Ok(()),
        }
    }
}
