//! Per-transaction entity identity cache.
//!
//! An [`EntityCache`] hands out at most one live handle per entity for the
//! lifetime of its transaction. Handles are built on demand by an
//! [`AccessorFactory`]; concurrent lookups of the same cold entity share a
//! single construction, and a construction that looks up its own entity
//! after registering sees the handle being built.
//!
//! The cache only holds weak references. A handle lives as long as some
//! caller holds it; dead entries are swept periodically or by
//! [`EntityCache::purge`].

mod flight;

use crate::entity::{AccessorFactory, EntityId, LiveHandle};
use crate::error::{CoreError, CoreResult};
use crate::transaction::Transaction;
use crate::types::TransactionId;
use dashmap::DashMap;
use flight::Flight;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use tracing::{debug, trace, warn};

type Handle<F> = <F as AccessorFactory>::Handle;

/// Maps entity identifiers to their unique live handles.
///
/// Obtained from [`Transaction::entity_cache`]; one per transaction.
pub struct EntityCache<F: AccessorFactory> {
    txn: Weak<Transaction>,
    txn_id: TransactionId,
    factory: Arc<F>,
    /// Handles that finished construction.
    published: DashMap<EntityId, Weak<Handle<F>>>,
    /// Constructions in progress, one per entity.
    flights: Mutex<HashMap<EntityId, Arc<Flight>>>,
    /// Handles registered by the thread constructing them.
    in_progress: Mutex<HashMap<(ThreadId, EntityId), Arc<Handle<F>>>>,
    sweep_interval: usize,
    publications: AtomicUsize,
}

impl<F: AccessorFactory> EntityCache<F> {
    pub(crate) fn new(txn: &Arc<Transaction>, factory: Arc<F>) -> Self {
        let config = txn.config();
        Self {
            txn: Arc::downgrade(txn),
            txn_id: txn.id(),
            factory,
            published: DashMap::with_capacity(config.cache_capacity),
            flights: Mutex::new(HashMap::new()),
            in_progress: Mutex::new(HashMap::new()),
            sweep_interval: config.cache_sweep_interval,
            publications: AtomicUsize::new(0),
        }
    }

    /// Returns the owning transaction's identifier.
    pub fn transaction_id(&self) -> TransactionId {
        self.txn_id
    }

    /// Returns the factory building this cache's handles.
    pub fn factory(&self) -> &Arc<F> {
        &self.factory
    }

    /// Returns the owning transaction if it is still active.
    ///
    /// # Errors
    ///
    /// Returns `StaleTransaction` once the transaction has closed.
    pub fn transaction(&self) -> CoreResult<Arc<Transaction>> {
        let txn = self.txn.upgrade().ok_or(CoreError::StaleTransaction {
            txn_id: self.txn_id,
        })?;
        txn.ensure_active()?;
        Ok(txn)
    }

    /// Returns the live handle for `id`, building it if needed.
    ///
    /// # Errors
    ///
    /// - `StaleTransaction` if the transaction has closed
    /// - `EntityNotFound` if the entity does not exist
    /// - `EntityConstructionFailed` if the factory fails, or if the
    ///   constructing thread looks up `id` before registering a handle
    pub fn get(self: &Arc<Self>, id: EntityId) -> CoreResult<Arc<Handle<F>>> {
        let txn = self.transaction()?;
        let me = thread::current().id();
        if let Some(handle) = self.in_progress.lock().get(&(me, id)) {
            return Ok(Arc::clone(handle));
        }

        loop {
            if let Some(handle) = self.peek(id) {
                return Ok(handle);
            }
            let waiting = {
                let mut flights = self.flights.lock();
                if let Some(handle) = self.peek(id) {
                    return Ok(handle);
                }
                match flights.get(&id) {
                    Some(flight) if flight.owner() == me => {
                        return Err(CoreError::construction_failed(
                            id,
                            "re-entrant lookup before the handle was registered",
                        ));
                    }
                    Some(flight) => Some(Arc::clone(flight)),
                    None => {
                        flights.insert(id, Arc::new(Flight::new()));
                        None
                    }
                }
            };
            match waiting {
                Some(flight) => {
                    trace!(target: "modeldb::cache", entity = %id, "waiting for construction");
                    flight.wait();
                }
                None => return self.construct(&txn, id, me),
            }
        }
    }

    /// Announces a handle whose construction is in progress.
    ///
    /// Lookups of the handle's entity from the constructing thread return
    /// it from then on. Registering the same handle twice is harmless.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if the calling thread is not constructing the
    ///   handle's entity
    /// - `ConflictingRegistration` if a different handle is registered
    pub fn register(&self, handle: &Arc<Handle<F>>) -> CoreResult<()> {
        let id = handle.entity_id();
        let me = thread::current().id();
        let constructing = self
            .flights
            .lock()
            .get(&id)
            .is_some_and(|flight| flight.owner() == me);
        if !constructing {
            return Err(CoreError::invalid_operation(format!(
                "entity {id} is not under construction on this thread"
            )));
        }

        let mut in_progress = self.in_progress.lock();
        match in_progress.get(&(me, id)) {
            Some(existing) if Arc::ptr_eq(existing, handle) => Ok(()),
            Some(_) => Err(CoreError::ConflictingRegistration { entity_id: id }),
            None => {
                in_progress.insert((me, id), Arc::clone(handle));
                Ok(())
            }
        }
    }

    /// Returns the published handle for `id` without building one.
    pub fn peek(&self, id: EntityId) -> Option<Arc<Handle<F>>> {
        self.published.get(&id).and_then(|entry| entry.upgrade())
    }

    /// Drops entries whose handles are gone, returning how many.
    pub fn purge(&self) -> usize {
        let before = self.published.len();
        self.published.retain(|_, handle| handle.strong_count() > 0);
        before.saturating_sub(self.published.len())
    }

    /// Counts published handles that are still alive.
    pub fn len(&self) -> usize {
        self.published
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .count()
    }

    /// Returns true if no published handle is alive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn construct(
        self: &Arc<Self>,
        txn: &Arc<Transaction>,
        id: EntityId,
        owner: ThreadId,
    ) -> CoreResult<Arc<Handle<F>>> {
        let _landing = Landing {
            cache: self,
            id,
            owner,
        };
        let result = self.build(txn, id);
        if let Err(err) = &result {
            warn!(target: "modeldb::cache", txn = %self.txn_id, entity = %id, error = %err, "handle construction failed");
        }
        result
    }

    fn build(self: &Arc<Self>, txn: &Arc<Transaction>, id: EntityId) -> CoreResult<Arc<Handle<F>>> {
        if !txn.exists(id)? {
            return Err(CoreError::EntityNotFound { entity_id: id });
        }
        let handle = self
            .factory
            .instantiate(self, txn, id)
            .map_err(|err| CoreError::construction_failed(id, err))?;
        if handle.entity_id() != id {
            return Err(CoreError::construction_failed(
                id,
                format!("factory built a handle for {}", handle.entity_id()),
            ));
        }
        self.register(&handle)?;
        self.factory
            .initialize(self, &handle)
            .map_err(|err| CoreError::construction_failed(id, err))?;
        self.publish(id, &handle);
        Ok(handle)
    }

    fn publish(&self, id: EntityId, handle: &Arc<Handle<F>>) {
        self.published.insert(id, Arc::downgrade(handle));
        debug!(target: "modeldb::cache", txn = %self.txn_id, entity = %id, "published handle");

        let count = self.publications.fetch_add(1, Ordering::Relaxed) + 1;
        if self.sweep_interval > 0 && count % self.sweep_interval == 0 {
            let swept = self.purge();
            trace!(target: "modeldb::cache", txn = %self.txn_id, swept, "swept dead handles");
        }
    }
}

impl<F: AccessorFactory> fmt::Debug for EntityCache<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCache")
            .field("txn", &self.txn_id)
            .field("published", &self.published.len())
            .finish()
    }
}

/// Ends a construction on every exit path.
///
/// Clears the in-progress entry before releasing waiters, so a waiter that
/// retries finds either the published handle or nothing at all.
struct Landing<'a, F: AccessorFactory> {
    cache: &'a EntityCache<F>,
    id: EntityId,
    owner: ThreadId,
}

impl<F: AccessorFactory> Drop for Landing<'_, F> {
    fn drop(&mut self) {
        self.cache.in_progress.lock().remove(&(self.owner, self.id));
        let flight = self.cache.flights.lock().remove(&self.id);
        if let Some(flight) = flight {
            flight.finish();
        }
    }
}
