//! # ctct Sync
//!
//! Keeps a local store of contacts, lists, custom fields and email campaigns
//! in step with a Constant Contact account.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   SyncJob    │────►│ SyncManager  │────►│  CtctClient  │──► api.cc.email/v3
//! └──────────────┘     └──────┬───────┘     └──────────────┘
//!                             │                    ▲
//!                             ▼                    │
//!                      ┌──────────────┐     ┌──────┴───────┐
//!                      │    Store     │◄────│   Importer   │
//!                      │ (Pg/Memory)  │     └──────────────┘
//!                      └──────────────┘
//! ```
//!
//! - [`SyncManager`] pushes, pulls and deletes single records, reconciles
//!   list memberships and drives the campaign activity lifecycle.
//! - [`Importer`] mirrors whole collections into the store.
//! - [`Store`] is the persistence seam: [`PgStore`] for PostgreSQL,
//!   [`MemoryStore`] for tests and dry runs.

pub mod error;
pub mod importer;
pub mod jobs;
pub mod manager;
pub mod record;
pub mod store;

pub use error::{StoreError, StoreResult, SyncError, SyncResult};
pub use importer::{ImportCounts, ImportReport, Importer, StatsReport};
pub use jobs::{JobOutcome, RecordKind, SyncJob};
pub use manager::{
    ContactListsOutcome, Deletion, MembershipChanges, PreviewSettings, PushOutcome, SyncManager,
    UpsertSummary,
};
pub use record::{ConflictLookup, SyncRecord};
pub use store::{MemoryStore, PgStore, Repository, Store};
