//! Email campaigns and their activities.

use crate::error::{CoreError, CoreResult};
use crate::ids::{LocalId, RemoteId};
use crate::record::impl_record;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Vendor lifecycle of a campaign and its activities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    /// Still being processed by the vendor.
    #[default]
    None,
    Draft,
    Scheduled,
    Executing,
    Done,
    Error,
    Removed,
}

impl CampaignStatus {
    /// Position on the forward path. `Error` and `Removed` sit off the path.
    fn rank(self) -> Option<u8> {
        match self {
            Self::None => Some(0),
            Self::Draft => Some(1),
            Self::Scheduled => Some(2),
            Self::Executing => Some(3),
            Self::Done => Some(4),
            Self::Error | Self::Removed => None,
        }
    }

    /// No further transitions are possible from a terminal state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Removed)
    }

    /// Whether `next` is reachable without moving backwards.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (Some(current), Some(target)) => target > current,
            // Error and Removed can interrupt any live campaign.
            (Some(_), None) => true,
            _ => false,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Draft => "DRAFT",
            Self::Scheduled => "SCHEDULED",
            Self::Executing => "EXECUTING",
            Self::Done => "DONE",
            Self::Error => "ERROR",
            Self::Removed => "REMOVED",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = String;

    /// The vendor reports `Draft` on campaigns and `DRAFT` on activities,
    /// so parsing ignores case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(Self::None),
            "DRAFT" => Ok(Self::Draft),
            "SCHEDULED" => Ok(Self::Scheduled),
            "EXECUTING" => Ok(Self::Executing),
            "DONE" | "SENT" => Ok(Self::Done),
            "ERROR" => Ok(Self::Error),
            "REMOVED" => Ok(Self::Removed),
            other => Err(format!("unknown campaign status '{other}'")),
        }
    }
}

/// Unique engagement counters from the campaign summary report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignStats {
    pub sends: i64,
    pub opens: i64,
    pub clicks: i64,
    pub forwards: i64,
    pub opt_outs: i64,
    pub abuse: i64,
    pub bounces: i64,
    pub not_opened: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityRole {
    #[default]
    PrimaryEmail,
    Permalink,
    Resend,
}

impl ActivityRole {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaryEmail => "primary_email",
            Self::Permalink => "permalink",
            Self::Resend => "resend",
        }
    }
}

impl FromStr for ActivityRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary_email" => Ok(Self::PrimaryEmail),
            "permalink" => Ok(Self::Permalink),
            "resend" => Ok(Self::Resend),
            other => Err(format!("unknown activity role '{other}'")),
        }
    }
}

/// The content and recipients of one campaign send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CampaignActivity {
    pub id: LocalId,
    pub api_id: Option<RemoteId>,
    pub role: ActivityRole,
    #[serde(default)]
    pub current_status: CampaignStatus,

    #[validate(length(max = 100))]
    #[serde(default)]
    pub from_name: String,
    #[validate(length(max = 80))]
    #[serde(default)]
    pub from_email: String,
    #[validate(length(max = 80))]
    #[serde(default)]
    pub reply_to_email: String,

    #[validate(length(max = 200, message = "Subject must be at most 200 characters"))]
    #[serde(default)]
    pub subject: String,
    /// Summary shown after the subject line in mail clients.
    #[validate(length(max = 130, message = "Preheader must be at most 130 characters"))]
    #[serde(default)]
    pub preheader: String,
    #[validate(length(max = 150000))]
    #[serde(default)]
    pub html_content: String,

    /// Local ids of the recipient lists.
    #[serde(default)]
    pub contact_lists: Vec<LocalId>,
    pub physical_address_in_footer: Option<serde_json::Value>,
    #[serde(default = "default_format_type")]
    pub format_type: u8,
}

impl_record!(CampaignActivity, "campaign activity");

fn default_format_type() -> u8 {
    CampaignActivity::MODERN_CUSTOM_CODE
}

impl CampaignActivity {
    /// Vendor format code for custom-coded HTML emails.
    pub const MODERN_CUSTOM_CODE: u8 = 5;

    #[must_use]
    pub fn new(role: ActivityRole) -> Self {
        Self {
            id: LocalId::new(),
            api_id: None,
            role,
            current_status: CampaignStatus::None,
            from_name: String::new(),
            from_email: String::new(),
            reply_to_email: String::new(),
            subject: String::new(),
            preheader: String::new(),
            html_content: String::new(),
            contact_lists: Vec::new(),
            physical_address_in_footer: None,
            format_type: Self::MODERN_CUSTOM_CODE,
        }
    }
}

/// An email campaign and the activities the vendor created for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct EmailCampaign {
    pub id: LocalId,
    pub api_id: Option<RemoteId>,

    #[validate(length(min = 1, max = 80, message = "Campaign name must be 1-80 characters"))]
    pub name: String,
    #[serde(default)]
    pub current_status: CampaignStatus,
    pub scheduled_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stats: CampaignStats,

    #[validate(nested)]
    #[serde(default)]
    pub activities: Vec<CampaignActivity>,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl_record!(EmailCampaign, "email campaign");

impl EmailCampaign {
    /// Minimum lead time when scheduling a send.
    pub const MIN_SCHEDULE_LEAD_MINUTES: i64 = 30;

    /// A new campaign with an empty primary email activity.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: LocalId::new(),
            api_id: None,
            name: name.into(),
            current_status: CampaignStatus::None,
            scheduled_datetime: None,
            stats: CampaignStats::default(),
            activities: vec![CampaignActivity::new(ActivityRole::PrimaryEmail)],
            created_at: None,
            updated_at: None,
        }
    }

    #[must_use]
    pub fn primary_activity(&self) -> Option<&CampaignActivity> {
        self.activity(ActivityRole::PrimaryEmail)
    }

    pub fn primary_activity_mut(&mut self) -> Option<&mut CampaignActivity> {
        self.activities
            .iter_mut()
            .find(|a| a.role == ActivityRole::PrimaryEmail)
    }

    #[must_use]
    pub fn activity(&self, role: ActivityRole) -> Option<&CampaignActivity> {
        self.activities.iter().find(|a| a.role == role)
    }

    /// Move the campaign (and its primary activity) forward.
    pub fn advance_to(&mut self, next: CampaignStatus) -> CoreResult<()> {
        if !self.current_status.can_advance_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.current_status,
                to: next,
            });
        }
        self.current_status = next;
        if let Some(activity) = self.primary_activity_mut() {
            activity.current_status = next;
        }
        Ok(())
    }

    /// Record a status reported by the vendor, whatever it is.
    pub fn observe(&mut self, status: CampaignStatus) {
        self.current_status = status;
    }

    /// Check the schedule against the minimum lead time.
    ///
    /// A missing schedule is an error; sent campaigns are exempt from the
    /// lead time.
    pub fn check_schedule(&self, now: DateTime<Utc>) -> CoreResult<DateTime<Utc>> {
        let scheduled = self
            .scheduled_datetime
            .ok_or_else(|| CoreError::InvalidSchedule("scheduled_datetime is not set".into()))?;

        if self.current_status != CampaignStatus::Done
            && scheduled < now + Duration::minutes(Self::MIN_SCHEDULE_LEAD_MINUTES)
        {
            return Err(CoreError::InvalidSchedule(format!(
                "must schedule the campaign at least {} minutes in the future",
                Self::MIN_SCHEDULE_LEAD_MINUTES
            )));
        }
        Ok(scheduled)
    }
}

impl fmt::Display for EmailCampaign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
