//! Local persistence behind the sync manager.
//!
//! Each synced type is reached through a [`Repository`]; a [`Store`] bundles
//! all of them together with OAuth token storage. [`MemoryStore`] backs the
//! tests, [`PgStore`] is the PostgreSQL implementation.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::StoreResult;
use async_trait::async_trait;
use ctct_client::{RemoteRefs, TokenStore};
use ctct_core::{Contact, ContactList, CustomField, EmailCampaign, LocalId, Record, RemoteId};

/// Data access for one record type.
#[async_trait]
pub trait Repository<R: Record>: Send + Sync {
    async fn find(&self, id: LocalId) -> StoreResult<Option<R>>;

    async fn find_by_api_id(&self, api_id: RemoteId) -> StoreResult<Option<R>>;

    async fn all(&self) -> StoreResult<Vec<R>>;

    /// Insert or replace by local id.
    ///
    /// Fails with [`StoreError::DuplicateApiId`](crate::StoreError::DuplicateApiId)
    /// when a different record already holds the same remote id.
    async fn save(&self, record: &R) -> StoreResult<()>;

    /// Returns whether a record was removed.
    async fn remove(&self, id: LocalId) -> StoreResult<bool>;
}

/// Everything the sync manager persists.
#[async_trait]
pub trait Store:
    Repository<ContactList>
    + Repository<CustomField>
    + Repository<Contact>
    + Repository<EmailCampaign>
    + TokenStore
    + Send
    + Sync
    + 'static
{
    /// Contacts that belong to `list`.
    async fn contacts_in_list(&self, list: LocalId) -> StoreResult<Vec<Contact>> {
        let contacts: Vec<Contact> = Repository::<Contact>::all(self).await?;
        Ok(contacts
            .into_iter()
            .filter(|c| c.list_memberships.contains(&list))
            .collect())
    }

    async fn find_contact_by_email(&self, email: &str) -> StoreResult<Option<Contact>> {
        let email = email.trim().to_lowercase();
        let contacts: Vec<Contact> = Repository::<Contact>::all(self).await?;
        Ok(contacts.into_iter().find(|c| c.email == email))
    }

    /// Id map for the lists and custom fields referenced by other records.
    async fn remote_refs(&self) -> StoreResult<RemoteRefs> {
        let lists: Vec<ContactList> = Repository::<ContactList>::all(self).await?;
        let fields: Vec<CustomField> = Repository::<CustomField>::all(self).await?;
        Ok(RemoteRefs::from_records(&lists, &fields))
    }
}
