//! Transactions over the ordered store.

use super::fields::{FieldList, FieldMap, FieldSet};
use super::state::TransactionState;
use crate::cache::EntityCache;
use crate::config::Config;
use crate::copy::{CopyEngine, CopyState, ReferencePath};
use crate::entity::layout::{entity_key, field_key, index_prefix, type_prefix, ENTITY_KEY_LEN};
use crate::entity::{AccessorFactory, EntityId};
use crate::error::{CoreError, CoreResult};
use crate::field_info::FieldType;
use crate::index::{KeySource, RawIndex};
use crate::schema::{FieldDecl, FieldKind, ModelType, Schema, TypeContext};
use crate::types::{StorageSlot, TransactionId};
use modeldb_codec::{decode_value, encode_value, Value};
use modeldb_storage::{OrderedStore, OverlayStore, PendingWrite};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::ops::Bound;
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace};

/// A unit of work over a database.
///
/// Writes are buffered and reach the database only on
/// [`Transaction::commit`]. Reads see the transaction's own writes. Once
/// committed or rolled back, every operation fails with
/// `StaleTransaction`.
///
/// Transactions are shared as `Arc<Transaction>`; views, caches and
/// handles keep the `Arc` they were created from.
pub struct Transaction {
    id: TransactionId,
    store: OverlayStore,
    schema: Arc<Schema>,
    config: Config,
    state: RwLock<TransactionState>,
    /// The entity cache, created on first request.
    cache: OnceLock<Arc<dyn Any + Send + Sync>>,
    /// Serializes commits of one database.
    commit_lock: Arc<Mutex<()>>,
}

impl Transaction {
    pub(crate) fn new(
        id: TransactionId,
        base: Arc<dyn OrderedStore>,
        schema: Arc<Schema>,
        config: Config,
        commit_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            id,
            store: OverlayStore::new(base),
            schema,
            config,
            state: RwLock::new(TransactionState::Active),
            cache: OnceLock::new(),
            commit_lock,
        }
    }

    /// Returns the transaction ID.
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the current state.
    pub fn state(&self) -> TransactionState {
        *self.state.read()
    }

    /// Returns true if the transaction is still active.
    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// Returns the schema.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fails with `StaleTransaction` unless the transaction is active.
    pub fn ensure_active(&self) -> CoreResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(CoreError::StaleTransaction { txn_id: self.id })
        }
    }

    /// Returns the buffered writes in key order.
    pub fn pending_writes(&self) -> Vec<(Vec<u8>, PendingWrite)> {
        self.store.pending()
    }

    /// Commits all buffered writes.
    ///
    /// Returns the number of applied writes.
    ///
    /// # Errors
    ///
    /// Returns `StaleTransaction` if already closed, or a storage error.
    pub fn commit(&self) -> CoreResult<usize> {
        let mut state = self.state.write();
        if !state.is_active() {
            return Err(CoreError::StaleTransaction { txn_id: self.id });
        }
        let applied = {
            let _serial = self.commit_lock.lock();
            self.store.apply()?
        };
        *state = TransactionState::Committed;
        debug!(target: "modeldb::txn", txn = %self.id, writes = applied, "transaction committed");
        Ok(applied)
    }

    /// Discards all buffered writes.
    ///
    /// # Errors
    ///
    /// Returns `StaleTransaction` if already closed.
    pub fn rollback(&self) -> CoreResult<()> {
        let mut state = self.state.write();
        if !state.is_active() {
            return Err(CoreError::StaleTransaction { txn_id: self.id });
        }
        self.store.discard();
        *state = TransactionState::RolledBack;
        debug!(target: "modeldb::txn", txn = %self.id, "transaction rolled back");
        Ok(())
    }

    // Store access. Every path into the store checks the state first.

    pub(crate) fn raw_get(&self, key: &[u8]) -> CoreResult<Option<Vec<u8>>> {
        self.ensure_active()?;
        Ok(self.store.get(key)?)
    }

    pub(crate) fn raw_put(&self, key: &[u8], value: &[u8]) -> CoreResult<()> {
        self.ensure_active()?;
        Ok(self.store.put(key, value)?)
    }

    pub(crate) fn raw_remove(&self, key: &[u8]) -> CoreResult<bool> {
        self.ensure_active()?;
        Ok(self.store.remove(key)?)
    }

    pub(crate) fn raw_scan(&self, prefix: &[u8]) -> CoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.ensure_active()?;
        Ok(self.store.scan_prefix(prefix)?)
    }

    pub(crate) fn read_value(&self, key: &[u8]) -> CoreResult<Option<Value>> {
        self.raw_get(key)?
            .map(|bytes| decode_value(&bytes).map_err(CoreError::from))
            .transpose()
    }

    pub(crate) fn write_value(&self, key: &[u8], value: &Value) -> CoreResult<()> {
        self.raw_put(key, &encode_value(value))
    }

    // Entities

    /// Returns the model type of `id`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if the schema has no type under the slot
    /// embedded in `id`.
    pub fn model_type_of(&self, id: EntityId) -> CoreResult<&ModelType> {
        let slot = id.type_slot();
        self.schema.model_type(slot).ok_or_else(|| {
            CoreError::schema_mismatch("unknown model type")
                .with_slot(slot)
                .with_entity(id)
        })
    }

    /// Creates an entity of the model type under `type_slot`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if the type is unknown.
    pub fn create(&self, type_slot: StorageSlot) -> CoreResult<EntityId> {
        let id = EntityId::new(type_slot);
        self.create_with_id(id)?;
        Ok(id)
    }

    /// Creates an entity with a caller-chosen ID.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if the type is unknown, or
    /// `InvalidOperation` if the entity already exists.
    pub fn create_with_id(&self, id: EntityId) -> CoreResult<()> {
        let ty = self.model_type_of(id)?;
        if self.exists(id)? {
            return Err(CoreError::invalid_operation(format!(
                "entity {id} already exists"
            )));
        }
        self.raw_put(&entity_key(id), &[])?;
        self.insert_initial_rows(id, ty)?;
        trace!(target: "modeldb::txn", txn = %self.id, entity = %id, ty = %ty.name, "entity created");
        Ok(())
    }

    /// Checks whether `id` exists.
    pub fn exists(&self, id: EntityId) -> CoreResult<bool> {
        Ok(self.raw_get(&entity_key(id))?.is_some())
    }

    /// Deletes `id` with all of its fields and index rows.
    ///
    /// Returns whether the entity existed.
    pub fn delete(&self, id: EntityId) -> CoreResult<bool> {
        if !self.exists(id)? {
            return Ok(false);
        }
        let ty = self.model_type_of(id)?;
        self.remove_all_rows(id, ty)?;
        self.ensure_active()?;
        self.store.remove_prefix(&entity_key(id))?;
        Ok(true)
    }

    /// Clears every field of `id`, keeping the entity itself.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity does not exist.
    pub fn reset(&self, id: EntityId) -> CoreResult<()> {
        self.require_entity(id)?;
        let ty = self.model_type_of(id)?;
        self.remove_all_rows(id, ty)?;
        self.ensure_active()?;
        self.store.remove_prefix(&entity_key(id))?;
        self.raw_put(&entity_key(id), &[])?;
        self.insert_initial_rows(id, ty)
    }

    /// Lists the entities of one model type in ID order.
    pub fn entities(&self, type_slot: StorageSlot) -> CoreResult<Vec<EntityId>> {
        Ok(self
            .raw_scan(&type_prefix(type_slot))?
            .into_iter()
            .filter(|(key, _)| key.len() == ENTITY_KEY_LEN)
            .filter_map(|(key, _)| EntityId::from_slice(&key[1..]))
            .collect())
    }

    pub(crate) fn require_entity(&self, id: EntityId) -> CoreResult<()> {
        if self.exists(id)? {
            Ok(())
        } else {
            Err(CoreError::EntityNotFound { entity_id: id })
        }
    }

    /// Looks up the declaration of `slot` in the type of `id`.
    pub(crate) fn declared(
        &self,
        id: EntityId,
        slot: StorageSlot,
    ) -> CoreResult<(&ModelType, &FieldDecl)> {
        let ty = self.model_type_of(id)?;
        let decl = ty.field_decl(slot).ok_or_else(|| {
            CoreError::schema_mismatch(format!("{} does not declare the field", ty.name))
                .with_slot(slot)
                .with_entity(id)
        })?;
        Ok((ty, decl))
    }

    // Fields

    /// Reads a simple, enum or reference field. Unset fields read as
    /// `Null`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if the entity's type has no such field.
    pub fn read_field(&self, id: EntityId, slot: StorageSlot) -> CoreResult<Value> {
        let (_, decl) = self.declared(id, slot)?;
        if decl.kind.value_type().is_none() {
            return Err(wrong_kind(id, decl, "a simple"));
        }
        Ok(self.read_value(&field_key(id, slot))?.unwrap_or(Value::Null))
    }

    /// Writes a simple, enum or reference field, returning the previous
    /// value. Writing `Null` clears the field.
    ///
    /// Index rows of the field and of composite indexes over it follow the
    /// new value.
    ///
    /// # Errors
    ///
    /// - `InvalidValue` if the field's type does not admit `value`
    /// - `EntityNotFound` if the entity does not exist
    pub fn write_field(&self, id: EntityId, slot: StorageSlot, value: Value) -> CoreResult<Value> {
        let (ty, decl) = self.declared(id, slot)?;
        let value_type = decl
            .kind
            .value_type()
            .ok_or_else(|| wrong_kind(id, decl, "a simple"))?;
        if !value.is_null() && !value_type.admits(&value) {
            return Err(CoreError::invalid_value(format!(
                "{} does not admit {value}",
                decl.name
            ))
            .with_slot(slot));
        }
        self.require_entity(id)?;

        let key = field_key(id, slot);
        let old = self.read_value(&key)?.unwrap_or(Value::Null);
        if old == value {
            return Ok(old);
        }
        self.reindex_field(id, ty, slot, &old, &value)?;
        if value.is_null() {
            self.raw_remove(&key)?;
        } else {
            self.write_value(&key, &value)?;
        }
        Ok(old)
    }

    /// Reads a counter. Unset counters read as zero.
    pub fn counter(&self, id: EntityId, slot: StorageSlot) -> CoreResult<i64> {
        let (_, decl) = self.declared(id, slot)?;
        if !matches!(decl.kind, FieldKind::Counter) {
            return Err(wrong_kind(id, decl, "a counter"));
        }
        Ok(self
            .read_value(&field_key(id, slot))?
            .and_then(|value| value.as_integer())
            .unwrap_or(0))
    }

    /// Adds `delta` to a counter, returning the new value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` on overflow.
    pub fn adjust_counter(&self, id: EntityId, slot: StorageSlot, delta: i64) -> CoreResult<i64> {
        let current = self.counter(id, slot)?;
        let next = current.checked_add(delta).ok_or_else(|| {
            CoreError::invalid_value(format!("counter overflow adding {delta} to {current}"))
                .with_slot(slot)
        })?;
        self.set_counter(id, slot, next)?;
        Ok(next)
    }

    /// Sets a counter.
    pub fn set_counter(&self, id: EntityId, slot: StorageSlot, value: i64) -> CoreResult<()> {
        let (_, decl) = self.declared(id, slot)?;
        if !matches!(decl.kind, FieldKind::Counter) {
            return Err(wrong_kind(id, decl, "a counter"));
        }
        self.require_entity(id)?;
        self.write_value(&field_key(id, slot), &Value::Integer(value))
    }

    /// Opens the set field `slot` of `id`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if the field is not a set, or
    /// `EntityNotFound` if the entity does not exist.
    pub fn set_field(self: &Arc<Self>, id: EntityId, slot: StorageSlot) -> CoreResult<FieldSet> {
        let (_, decl) = self.declared(id, slot)?;
        let FieldKind::Set(element) = &decl.kind else {
            return Err(wrong_kind(id, decl, "a set"));
        };
        let element = element.clone();
        self.require_entity(id)?;
        Ok(FieldSet::new(Arc::clone(self), id, slot, element))
    }

    /// Opens the list field `slot` of `id`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if the field is not a list, or
    /// `EntityNotFound` if the entity does not exist.
    pub fn list_field(self: &Arc<Self>, id: EntityId, slot: StorageSlot) -> CoreResult<FieldList> {
        let (_, decl) = self.declared(id, slot)?;
        let FieldKind::List(element) = &decl.kind else {
            return Err(wrong_kind(id, decl, "a list"));
        };
        let element = element.clone();
        self.require_entity(id)?;
        Ok(FieldList::new(Arc::clone(self), id, slot, element))
    }

    /// Opens the map field `slot` of `id`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if the field is not a map, or
    /// `EntityNotFound` if the entity does not exist.
    pub fn map_field(self: &Arc<Self>, id: EntityId, slot: StorageSlot) -> CoreResult<FieldMap> {
        let (_, decl) = self.declared(id, slot)?;
        let FieldKind::Map { key, value } = &decl.kind else {
            return Err(wrong_kind(id, decl, "a map"));
        };
        let (key, value) = (key.clone(), value.clone());
        self.require_entity(id)?;
        Ok(FieldMap::new(Arc::clone(self), id, slot, key, value))
    }

    /// Resolves the type of a field as seen from `context`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if the field is unknown or has no common
    /// type across the applicable declarations.
    pub fn field_type(&self, slot: StorageSlot, context: &TypeContext) -> CoreResult<FieldType> {
        self.schema
            .field_infos()
            .field(slot)
            .ok_or_else(|| CoreError::schema_mismatch("unknown field").with_slot(slot))?
            .resolved_type(context)
    }

    /// Opens the raw index relation stored under `slot`.
    ///
    /// Composite indexes, indexed fields, indexed set elements and indexed
    /// map keys each have one.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIndex` if nothing is indexed under `slot`.
    pub fn index(self: &Arc<Self>, slot: StorageSlot) -> CoreResult<RawIndex> {
        self.ensure_active()?;
        let arity = self
            .schema
            .index_arity(slot)
            .ok_or(CoreError::UnknownIndex { slot })?;
        let source: Arc<dyn KeySource> = Arc::clone(self) as Arc<dyn KeySource>;
        Ok(RawIndex::new(source, index_prefix(slot), arity + 1))
    }

    /// Returns the transaction's entity cache, creating it with `factory`
    /// on first use.
    ///
    /// Later calls return the same cache and ignore `factory`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the cache was created for a different
    /// factory type.
    pub fn entity_cache<F: AccessorFactory>(
        self: &Arc<Self>,
        factory: Arc<F>,
    ) -> CoreResult<Arc<EntityCache<F>>> {
        self.ensure_active()?;
        let erased = self.cache.get_or_init(|| {
            debug!(target: "modeldb::cache", txn = %self.id, "entity cache created");
            Arc::new(EntityCache::new(self, factory)) as Arc<dyn Any + Send + Sync>
        });
        Arc::clone(erased)
            .downcast::<EntityCache<F>>()
            .map_err(|_| {
                CoreError::invalid_operation(
                    "transaction already has an entity cache for another factory",
                )
            })
    }

    /// Copies `id` and everything reachable along `paths` into `dest`.
    ///
    /// See [`CopyEngine::copy`].
    pub fn copy_to(
        self: &Arc<Self>,
        dest: &Arc<Transaction>,
        state: &mut CopyState,
        id: EntityId,
        paths: &[ReferencePath],
    ) -> CoreResult<usize> {
        CopyEngine::new(self, dest).copy(state, id, None, paths)
    }
}

fn wrong_kind(id: EntityId, decl: &FieldDecl, expected: &str) -> CoreError {
    CoreError::schema_mismatch(format!(
        "{} is a {} field, not {expected} field",
        decl.name,
        decl.kind.tag()
    ))
    .with_slot(decl.slot)
    .with_entity(id)
}

impl KeySource for Transaction {
    fn scan_keys(
        &self,
        prefix: &[u8],
        from: Bound<&[u8]>,
        limit: usize,
    ) -> CoreResult<Vec<Vec<u8>>> {
        self.ensure_active()?;
        Ok(self.store.scan_keys(prefix, from, limit)?)
    }

    fn has_prefix(&self, prefix: &[u8]) -> CoreResult<bool> {
        self.ensure_active()?;
        Ok(self.store.has_prefix(prefix)?)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("pending", &self.store.write_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        EnumDef, FieldDecl, IndexDecl, RefTarget, ScalarType, SchemaBuilder, SubFieldDecl,
        ValueType,
    };
    use crate::view::{ListView, MapView, SetView};
    use crate::Database;

    const ITEM: StorageSlot = StorageSlot(1);
    const NAME: StorageSlot = StorageSlot(10);
    const RANK: StorageSlot = StorageSlot(11);
    const STATE: StorageSlot = StorageSlot(12);
    const HITS: StorageSlot = StorageSlot(13);
    const LABELS: StorageSlot = StorageSlot(14);
    const LABEL: StorageSlot = StorageSlot(15);
    const PARTS: StorageSlot = StorageSlot(16);
    const NOTES: StorageSlot = StorageSlot(18);
    const NOTE_KEY: StorageSlot = StorageSlot(19);
    const BY_NAME_RANK: StorageSlot = StorageSlot(30);

    fn database() -> Database {
        let text = || ValueType::Scalar(ScalarType::Text);
        let item = ModelType::new("Item", 1)
            .field(FieldDecl::new(10, "name", FieldKind::Simple(ScalarType::Text)).indexed())
            .field(FieldDecl::new(11, "rank", FieldKind::Simple(ScalarType::Integer)))
            .field(FieldDecl::new(
                12,
                "state",
                FieldKind::Enum(EnumDef::new("State", ["Open", "Closed"])),
            ))
            .field(FieldDecl::new(13, "hits", FieldKind::Counter))
            .field(FieldDecl::new(
                14,
                "labels",
                FieldKind::Set(SubFieldDecl::new(15, "label", text()).indexed()),
            ))
            .field(FieldDecl::new(
                16,
                "parts",
                FieldKind::List(SubFieldDecl::new(
                    17,
                    "part",
                    ValueType::Reference(RefTarget::Any),
                )),
            ))
            .field(FieldDecl::new(
                18,
                "notes",
                FieldKind::Map {
                    key: SubFieldDecl::new(19, "topic", text()).indexed(),
                    value: SubFieldDecl::new(20, "note", text()),
                },
            ));
        let schema = SchemaBuilder::new()
            .model(item)
            .index(IndexDecl::new("by_name_rank", 30, [10, 11]));
        Database::open_in_memory(&schema).unwrap()
    }

    #[test]
    fn fields_round_trip_and_validate() {
        let db = database();
        let txn = db.begin();
        let id = txn.create(ITEM).unwrap();

        assert_eq!(txn.read_field(id, NAME).unwrap(), Value::Null);
        txn.write_field(id, NAME, Value::text("bolt")).unwrap();
        assert_eq!(txn.read_field(id, NAME).unwrap(), Value::text("bolt"));

        let err = txn.write_field(id, RANK, Value::text("high")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidValue { slot: Some(s), .. } if s == RANK));

        let err = txn
            .write_field(id, STATE, Value::enumeration(1, "Open"))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidValue { .. }));
        txn.write_field(id, STATE, Value::enumeration(1, "Closed"))
            .unwrap();

        assert!(matches!(
            txn.read_field(id, HITS),
            Err(CoreError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn counters_adjust_with_overflow_check() {
        let db = database();
        let txn = db.begin();
        let id = txn.create(ITEM).unwrap();
        assert_eq!(txn.adjust_counter(id, HITS, 5).unwrap(), 5);
        assert_eq!(txn.adjust_counter(id, HITS, -2).unwrap(), 3);
        txn.set_counter(id, HITS, i64::MAX).unwrap();
        assert!(txn.adjust_counter(id, HITS, 1).is_err());
    }

    #[test]
    fn index_rows_follow_writes() {
        let db = database();
        let txn = db.begin();
        let id = txn.create(ITEM).unwrap();
        let target = Value::Reference(*id.as_bytes());

        let by_name = txn.index(NAME).unwrap();
        assert_eq!(by_name.to_vec().unwrap(), vec![vec![Value::Null, target.clone()]]);

        txn.write_field(id, NAME, Value::text("bolt")).unwrap();
        txn.write_field(id, RANK, Value::Integer(2)).unwrap();
        assert_eq!(
            by_name.to_vec().unwrap(),
            vec![vec![Value::text("bolt"), target.clone()]]
        );
        assert_eq!(
            txn.index(BY_NAME_RANK).unwrap().to_vec().unwrap(),
            vec![vec![Value::text("bolt"), Value::Integer(2), target.clone()]]
        );

        txn.delete(id).unwrap();
        assert!(by_name.is_empty().unwrap());
        assert!(txn.index(BY_NAME_RANK).unwrap().is_empty().unwrap());
        assert!(matches!(
            txn.index(RANK),
            Err(CoreError::UnknownIndex { .. })
        ));
    }

    #[test]
    fn complex_fields_write_through() {
        let db = database();
        let txn = db.begin();
        let id = txn.create(ITEM).unwrap();
        let other = txn.create(ITEM).unwrap();

        let labels = txn.set_field(id, LABELS).unwrap();
        assert!(labels.insert(Value::text("b")).unwrap());
        assert!(labels.insert(Value::text("a")).unwrap());
        assert_eq!(
            labels.to_vec().unwrap(),
            vec![Value::text("a"), Value::text("b")]
        );
        assert_eq!(txn.index(LABEL).unwrap().len().unwrap(), 2);
        assert!(labels.remove(&Value::text("a")).unwrap());
        assert_eq!(txn.index(LABEL).unwrap().len().unwrap(), 1);

        let parts = txn.list_field(id, PARTS).unwrap();
        parts.push(Value::Reference(*other.as_bytes())).unwrap();
        assert_eq!(parts.len().unwrap(), 1);
        assert!(parts.push(Value::Integer(1)).is_err());

        let notes = txn.map_field(id, NOTES).unwrap();
        assert_eq!(notes.put(Value::text("k"), Value::text("v")).unwrap(), None);
        assert_eq!(notes.get(&Value::text("k")).unwrap(), Some(Value::text("v")));
        assert_eq!(txn.index(NOTE_KEY).unwrap().len().unwrap(), 1);
    }

    #[test]
    fn commit_publishes_and_closes() {
        let db = database();
        let txn = db.begin();
        let id = txn.create(ITEM).unwrap();
        txn.write_field(id, NAME, Value::text("bolt")).unwrap();
        assert!(txn.commit().unwrap() > 0);
        assert!(matches!(
            txn.exists(id),
            Err(CoreError::StaleTransaction { .. })
        ));

        let next = db.begin();
        assert_eq!(next.entities(ITEM).unwrap(), vec![id]);
        next.rollback().unwrap();
        assert!(next.commit().is_err());
    }

    #[test]
    fn rollback_discards_writes() {
        let db = database();
        let txn = db.begin();
        let id = txn.create(ITEM).unwrap();
        txn.rollback().unwrap();
        assert!(!db.begin().exists(id).unwrap());
    }

    #[test]
    fn reset_clears_fields() {
        let db = database();
        let txn = db.begin();
        let id = txn.create(ITEM).unwrap();
        txn.write_field(id, NAME, Value::text("bolt")).unwrap();
        txn.reset(id).unwrap();
        assert!(txn.exists(id).unwrap());
        assert_eq!(txn.read_field(id, NAME).unwrap(), Value::Null);
        assert_eq!(txn.index(NAME).unwrap().len().unwrap(), 1);
    }
}
