//! Live handle and accessor factory contracts.

use crate::cache::EntityCache;
use crate::entity::EntityId;
use crate::error::BoxError;
use crate::transaction::Transaction;
use std::sync::Arc;

/// A per-transaction proxy for one stored entity.
///
/// Handles are built by an [`AccessorFactory`] and handed out by an
/// [`EntityCache`], which guarantees one live handle per entity and
/// transaction.
pub trait LiveHandle: Send + Sync + 'static {
    /// Returns the entity this handle represents.
    fn entity_id(&self) -> EntityId;
}

/// Builds live handles bound to a transaction.
///
/// # Re-entrancy
///
/// `instantiate` may look up other entities through `cache`. It may also
/// look up its own entity, but only after announcing the new handle with
/// [`EntityCache::register`]; an earlier self-lookup fails with
/// `EntityConstructionFailed`. `initialize` runs after registration and may
/// re-enter the cache freely.
pub trait AccessorFactory: Send + Sync + Sized + 'static {
    /// The handle type this factory builds.
    type Handle: LiveHandle;

    /// Creates a new handle for `id`.
    ///
    /// # Errors
    ///
    /// Any error is reported to the caller as `EntityConstructionFailed`.
    fn instantiate(
        &self,
        cache: &Arc<EntityCache<Self>>,
        txn: &Arc<Transaction>,
        id: EntityId,
    ) -> Result<Arc<Self::Handle>, BoxError>;

    /// Finishes a registered handle before it is published.
    ///
    /// # Errors
    ///
    /// Any error is reported to the caller as `EntityConstructionFailed`.
    fn initialize(
        &self,
        _cache: &Arc<EntityCache<Self>>,
        _handle: &Arc<Self::Handle>,
    ) -> Result<(), BoxError> {
        Ok(())
    }
}
