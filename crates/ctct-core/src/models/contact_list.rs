//! Contact list record.

use crate::ids::{LocalId, RemoteId};
use crate::record::impl_record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A Constant Contact contact list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ContactList {
    pub id: LocalId,
    pub api_id: Option<RemoteId>,

    #[validate(length(min = 1, max = 255, message = "List name must be 1-255 characters"))]
    pub name: String,

    #[validate(length(max = 255, message = "Description must be at most 255 characters"))]
    #[serde(default)]
    pub description: String,

    /// Favorite lists are pinned in the vendor UI.
    #[serde(default)]
    pub favorite: bool,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl_record!(ContactList, "contact list");

impl ContactList {
    /// A new, not yet synced, list.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: LocalId::new(),
            api_id: None,
            name: name.into(),
            description: String::new(),
            favorite: false,
            created_at: None,
            updated_at: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl std::fmt::Display for ContactList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_length_validation() {
        assert!(ContactList::new("Board").validate().is_ok());
        assert!(ContactList::new("").validate().is_err());
        assert!(ContactList::new("x".repeat(256)).validate().is_err());
    }
}
