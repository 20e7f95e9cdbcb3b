//! ctct Core Library
//!
//! Local record types mirroring the Constant Contact v3 resources.
//!
//! # Modules
//!
//! - [`ids`] - Strongly typed identifiers (`LocalId`, `RemoteId`)
//! - [`record`] - The [`Record`] trait shared by every synced type
//! - [`models`] - Contacts, lists, custom fields, campaigns and tokens
//! - [`error`] - Domain errors (`CoreError`)
//!
//! # Example
//!
//! ```
//! use ctct_core::{ContactList, Record, RemoteId};
//!
//! let mut list = ContactList::new("Newsletter");
//! assert!(list.api_id().is_none());
//!
//! let remote = RemoteId::new();
//! list.assign_api_id(remote).unwrap();
//! assert_eq!(list.api_id(), Some(remote));
//! ```

pub mod error;
pub mod ids;
pub mod models;
pub mod record;

pub use error::{CoreError, CoreResult};
pub use ids::{LocalId, ParseIdError, RemoteId};
pub use models::{
    ActivityRole, CampaignActivity, CampaignStats, CampaignStatus, Contact, ContactCustomField,
    ContactList, ContactNote, CustomField, CustomFieldType, EmailCampaign, PermissionToSend,
    PhoneKind, PhoneNumber, Source, StreetAddress, StreetKind, Token,
};
pub use record::Record;
