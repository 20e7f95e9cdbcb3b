//! Local record types.

mod campaign;
mod contact;
mod contact_list;
mod custom_field;
mod token;

pub use campaign::{ActivityRole, CampaignActivity, CampaignStats, CampaignStatus, EmailCampaign};
pub use contact::{
    Contact, ContactCustomField, ContactNote, PermissionToSend, PhoneKind, PhoneNumber, Source,
    StreetAddress, StreetKind,
};
pub use contact_list::ContactList;
pub use custom_field::{CustomField, CustomFieldType};
pub use token::Token;
