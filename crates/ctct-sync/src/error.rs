//! Error types for the ctct-sync crate.

use ctct_client::CtctError;
use ctct_core::{CoreError, LocalId, RemoteId};
use thiserror::Error;

/// Result alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result alias for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Local persistence errors. These are never swallowed by the manager.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database query failed.
    #[error("Query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),

    /// A database migration failed to apply.
    #[error("Migration failed: {0}")]
    MigrationFailed(#[from] sqlx::migrate::MigrateError),

    /// Another record of the same type is already bound to this remote id.
    #[error("{resource} {api_id} is already bound to local record {existing}")]
    DuplicateApiId {
        resource: &'static str,
        api_id: RemoteId,
        existing: LocalId,
    },

    /// A stored value could not be decoded.
    #[error("Corrupt {resource} row: {detail}")]
    Corrupt {
        resource: &'static str,
        detail: String,
    },
}

impl StoreError {
    pub(crate) fn corrupt(resource: &'static str, detail: impl ToString) -> Self {
        Self::Corrupt {
            resource,
            detail: detail.to_string(),
        }
    }
}

/// Errors surfaced by [`SyncManager`](crate::SyncManager) and
/// [`Importer`](crate::Importer).
#[derive(Debug, Error)]
pub enum SyncError {
    /// The vendor call failed (after retries, where applicable).
    #[error(transparent)]
    Remote(#[from] CtctError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A get-by-id for a known remote id came back empty.
    #[error("{resource} {api_id} vanished: the API returned no object for a known id")]
    Vanished {
        resource: &'static str,
        api_id: RemoteId,
    },

    /// The operation needs a remote id the record does not have yet.
    #[error("{resource} {id} has not been pushed to Constant Contact")]
    NotSynced { resource: &'static str, id: LocalId },

    /// No local record with this id.
    #[error("{resource} {id} does not exist locally")]
    MissingRecord { resource: &'static str, id: LocalId },

    /// A local record failed its own field constraints.
    #[error("invalid {resource}: {errors}")]
    Validation {
        resource: &'static str,
        errors: validator::ValidationErrors,
    },

    /// Identifier, status or schedule rule violated.
    #[error(transparent)]
    Lifecycle(#[from] CoreError),
}

impl SyncError {
    #[must_use]
    pub fn is_vanished(&self) -> bool {
        matches!(self, Self::Vanished { .. })
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Validation { .. } => true,
            Self::Remote(e) => matches!(e, CtctError::Validation(_)),
            Self::Lifecycle(e) => e.is_validation(),
            _ => false,
        }
    }

    /// The vendor error behind this failure, if any.
    #[must_use]
    pub fn remote(&self) -> Option<&CtctError> {
        match self {
            Self::Remote(e) => Some(e),
            _ => None,
        }
    }
}
