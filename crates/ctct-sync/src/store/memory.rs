//! In-memory store used by tests and dry runs.

use super::{Repository, Store};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use ctct_client::{CtctResult, MemoryTokenStore, TokenStore};
use ctct_core::{
    Contact, ContactList, CustomField, EmailCampaign, LocalId, Record, RemoteId, Token,
};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

type Table<R> = RwLock<BTreeMap<LocalId, R>>;

/// Store that keeps every record in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    lists: Table<ContactList>,
    custom_fields: Table<CustomField>,
    contacts: Table<Contact>,
    campaigns: Table<EmailCampaign>,
    tokens: MemoryTokenStore,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: Token) -> Self {
        Self {
            tokens: MemoryTokenStore::with_token(token),
            ..Self::default()
        }
    }
}

fn save_into<R: Record>(table: &mut BTreeMap<LocalId, R>, record: &R) -> StoreResult<()> {
    if let Some(api_id) = record.api_id() {
        let holder = table
            .values()
            .find(|r| r.api_id() == Some(api_id) && r.id() != record.id());
        if let Some(existing) = holder {
            return Err(StoreError::DuplicateApiId {
                resource: R::RESOURCE,
                api_id,
                existing: existing.id(),
            });
        }
    }
    table.insert(record.id(), record.clone());
    Ok(())
}

macro_rules! memory_repository {
    ($ty:ty, $field:ident) => {
        #[async_trait]
        impl Repository<$ty> for MemoryStore {
            async fn find(&self, id: LocalId) -> StoreResult<Option<$ty>> {
                Ok(self.$field.read().await.get(&id).cloned())
            }

            async fn find_by_api_id(&self, api_id: RemoteId) -> StoreResult<Option<$ty>> {
                Ok(self
                    .$field
                    .read()
                    .await
                    .values()
                    .find(|r| r.api_id() == Some(api_id))
                    .cloned())
            }

            async fn all(&self) -> StoreResult<Vec<$ty>> {
                Ok(self.$field.read().await.values().cloned().collect())
            }

            async fn save(&self, record: &$ty) -> StoreResult<()> {
                save_into(&mut *self.$field.write().await, record)
            }

            async fn remove(&self, id: LocalId) -> StoreResult<bool> {
                Ok(self.$field.write().await.remove(&id).is_some())
            }
        }
    };
}

memory_repository!(ContactList, lists);
memory_repository!(CustomField, custom_fields);
memory_repository!(Contact, contacts);
memory_repository!(EmailCampaign, campaigns);

#[async_trait]
impl TokenStore for MemoryStore {
    async fn current_token(&self) -> CtctResult<Option<Token>> {
        self.tokens.current_token().await
    }

    async fn save_token(&self, token: &Token) -> CtctResult<()> {
        self.tokens.save_token(token).await
    }
}

impl Store for MemoryStore {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_find_by_api_id() {
        let store = MemoryStore::new();
        let mut list = ContactList::new("Members");
        let remote = RemoteId::new();
        list.assign_api_id(remote).unwrap();

        store.save(&list).await.unwrap();
        let found: Option<ContactList> = store.find_by_api_id(remote).await.unwrap();
        assert_eq!(found.unwrap().id, list.id);
    }

    #[tokio::test]
    async fn test_duplicate_api_id_rejected() {
        let store = MemoryStore::new();
        let remote = RemoteId::new();

        let mut first = ContactList::new("First");
        first.assign_api_id(remote).unwrap();
        store.save(&first).await.unwrap();

        let mut second = ContactList::new("Second");
        second.assign_api_id(remote).unwrap();
        let err = store.save(&second).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateApiId { existing, .. } if existing == first.id));

        // Re-saving the holder itself is fine.
        first.name = "Renamed".into();
        store.save(&first).await.unwrap();
    }

    #[tokio::test]
    async fn test_contacts_in_list() {
        let store = MemoryStore::new();
        let list = ContactList::new("Members");
        store.save(&list).await.unwrap();

        store
            .save(&Contact::new("in@example.com").with_list(list.id))
            .await
            .unwrap();
        store.save(&Contact::new("out@example.com")).await.unwrap();

        let members = store.contacts_in_list(list.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].email, "in@example.com");
    }

    #[tokio::test]
    async fn test_find_contact_by_email_normalizes() {
        let store = MemoryStore::new();
        store.save(&Contact::new("Someone@Example.com")).await.unwrap();
        let found = store.find_contact_by_email(" SOMEONE@example.com").await.unwrap();
        assert!(found.is_some());
    }
}
