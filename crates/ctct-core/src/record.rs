//! The [`Record`] trait implemented by every synced type.

use crate::error::{CoreError, CoreResult};
use crate::ids::{LocalId, RemoteId};

/// A locally persisted record that mirrors one Constant Contact resource.
pub trait Record: Clone + Send + Sync + 'static {
    /// Human readable resource name, used in logs and errors.
    const RESOURCE: &'static str;

    /// Local primary key.
    fn id(&self) -> LocalId;

    /// Replace the local primary key (used when merging a pulled record into
    /// an existing row).
    fn set_id(&mut self, id: LocalId);

    /// Vendor identifier, if the record exists remotely.
    fn api_id(&self) -> Option<RemoteId>;

    #[doc(hidden)]
    fn api_id_mut(&mut self) -> &mut Option<RemoteId>;

    /// Bind the record to a remote identifier.
    ///
    /// Re-assigning the same id is a no-op. Assigning a different id to a
    /// record that is already bound fails with
    /// [`CoreError::IdentifierConflict`].
    fn assign_api_id(&mut self, api_id: RemoteId) -> CoreResult<()> {
        let slot = self.api_id_mut();
        match *slot {
            Some(existing) if existing != api_id => Err(CoreError::IdentifierConflict {
                resource: Self::RESOURCE,
                existing,
                attempted: api_id,
            }),
            _ => {
                *slot = Some(api_id);
                Ok(())
            }
        }
    }
}

/// Implements [`Record`] for a struct with `id: LocalId` and
/// `api_id: Option<RemoteId>` fields.
macro_rules! impl_record {
    ($ty:ty, $resource:literal) => {
        impl $crate::record::Record for $ty {
            const RESOURCE: &'static str = $resource;

            fn id(&self) -> $crate::ids::LocalId {
                self.id
            }

            fn set_id(&mut self, id: $crate::ids::LocalId) {
                self.id = id;
            }

            fn api_id(&self) -> Option<$crate::ids::RemoteId> {
                self.api_id
            }

            fn api_id_mut(&mut self) -> &mut Option<$crate::ids::RemoteId> {
                &mut self.api_id
            }
        }
    };
}

pub(crate) use impl_record;
