//! Database facade.

use crate::config::Config;
use crate::error::CoreResult;
use crate::schema::{Schema, SchemaBinder};
use crate::transaction::Transaction;
use crate::types::TransactionId;
use modeldb_storage::{InMemoryStore, OrderedStore};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// The main database handle.
///
/// `Database` binds a schema to an ordered store and hands out
/// transactions over it.
///
/// # Example
///
/// ```rust
/// use modeldb_core::schema::{FieldDecl, FieldKind, ModelType, ScalarType, SchemaBuilder};
/// use modeldb_core::{Database, StorageSlot};
/// use modeldb_codec::Value;
///
/// let schema = SchemaBuilder::new().model(
///     ModelType::new("Person", 1)
///         .field(FieldDecl::new(10, "name", FieldKind::Simple(ScalarType::Text))),
/// );
/// let db = Database::open_in_memory(&schema).unwrap();
///
/// let txn = db.begin();
/// let id = txn.create(StorageSlot(1)).unwrap();
/// txn.write_field(id, StorageSlot(10), Value::text("Ada")).unwrap();
/// txn.commit().unwrap();
///
/// let txn = db.begin();
/// assert_eq!(txn.read_field(id, StorageSlot(10)).unwrap(), Value::text("Ada"));
/// ```
pub struct Database {
    store: Arc<dyn OrderedStore>,
    schema: Arc<Schema>,
    config: Config,
    next_txn: AtomicU64,
    /// Shared with every transaction so commits apply one at a time.
    commit_lock: Arc<Mutex<()>>,
}

impl Database {
    /// Opens a database over `store` with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if the binder's declarations are
    /// inconsistent.
    pub fn open(store: Arc<dyn OrderedStore>, binder: &dyn SchemaBinder) -> CoreResult<Self> {
        Self::open_with_config(store, binder, Config::default())
    }

    /// Opens a database over `store` with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if the binder's declarations are
    /// inconsistent, or if validation is enabled and fails.
    pub fn open_with_config(
        store: Arc<dyn OrderedStore>,
        binder: &dyn SchemaBinder,
        config: Config,
    ) -> CoreResult<Self> {
        let schema = Schema::bind(binder)?;
        if config.verify_schema_on_open {
            schema.validate()?;
        }
        debug!(
            target: "modeldb::txn",
            types = schema.model_types().count(),
            fields = schema.field_infos().len(),
            "database opened"
        );
        Ok(Self {
            store,
            schema: Arc::new(schema),
            config,
            next_txn: AtomicU64::new(1),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Opens a database over a fresh in-memory store.
    ///
    /// # Errors
    ///
    /// See [`Database::open`].
    pub fn open_in_memory(binder: &dyn SchemaBinder) -> CoreResult<Self> {
        Self::open(Arc::new(InMemoryStore::new()), binder)
    }

    /// Returns the bound schema.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<dyn OrderedStore> {
        &self.store
    }

    /// Begins a new transaction.
    pub fn begin(&self) -> Arc<Transaction> {
        let id = TransactionId::new(self.next_txn.fetch_add(1, Ordering::Relaxed));
        debug!(target: "modeldb::txn", txn = %id, "transaction started");
        Arc::new(Transaction::new(
            id,
            Arc::clone(&self.store),
            Arc::clone(&self.schema),
            self.config.clone(),
            Arc::clone(&self.commit_lock),
        ))
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("types", &self.schema.model_types().count())
            .field("next_txn", &self.next_txn.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::schema::{FieldDecl, FieldKind, IndexDecl, ModelType, ScalarType, SchemaBuilder};

    fn person() -> ModelType {
        ModelType::new("Person", 1)
            .field(FieldDecl::new(10, "name", FieldKind::Simple(ScalarType::Text)))
            .field(FieldDecl::new(11, "age", FieldKind::Simple(ScalarType::Integer)))
    }

    #[test]
    fn transaction_ids_increase() {
        let db = Database::open_in_memory(&SchemaBuilder::new().model(person())).unwrap();
        let a = db.begin();
        let b = db.begin();
        assert!(a.id() < b.id());
    }

    #[test]
    fn validation_runs_on_open() {
        let bad = SchemaBuilder::new()
            .model(person())
            .index(IndexDecl::new("too_wide", 30, [10, 11, 10, 11, 10]));
        assert!(matches!(
            Database::open_in_memory(&bad),
            Err(CoreError::SchemaMismatch { .. })
        ));

        let lenient = Config::new().verify_schema_on_open(false);
        let db = Database::open_with_config(Arc::new(InMemoryStore::new()), &bad, lenient);
        assert!(db.is_ok());
    }

    #[test]
    fn commits_are_visible_to_later_transactions() {
        let store = Arc::new(InMemoryStore::new());
        let db = Database::open(store.clone(), &SchemaBuilder::new().model(person())).unwrap();

        let txn = db.begin();
        let id = txn.create(crate::StorageSlot(1)).unwrap();
        assert!(store.is_empty());
        txn.commit().unwrap();
        assert!(!store.is_empty());
        assert!(db.begin().exists(id).unwrap());
    }
}
