//! Domain errors for local records.

use crate::ids::RemoteId;
use crate::models::CampaignStatus;
use thiserror::Error;

/// Result alias for core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors raised by invariants on local records.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A record already carries a different remote identifier.
    #[error("{resource} is already bound to remote id {existing}, refusing to rebind to {attempted}")]
    IdentifierConflict {
        resource: &'static str,
        existing: RemoteId,
        attempted: RemoteId,
    },

    /// A requested status change would move a campaign backwards.
    #[error("cannot move campaign status from {from} to {to}")]
    InvalidTransition {
        from: CampaignStatus,
        to: CampaignStatus,
    },

    /// Scheduling constraints were not met.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Local field constraints were violated.
    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

impl CoreError {
    /// Whether this error came from field validation.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
