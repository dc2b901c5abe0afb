//! Views over set, list and map fields.
//!
//! ```text
//! set element    field key | enc(element)  -> empty
//! list element   field key | enc(position) -> enc(element)
//! map entry      field key | enc(key)      -> enc(value)
//! ```

use super::txn::Transaction;
use crate::entity::layout::{element_key, field_key};
use crate::entity::EntityId;
use crate::error::{CoreError, CoreResult};
use crate::schema::SubFieldDecl;
use crate::types::StorageSlot;
use crate::view::{ListView, MapView, SetView, ViewIter};
use modeldb_codec::{decode_value, Value};
use std::fmt;
use std::sync::Arc;

fn check(decl: &SubFieldDecl, value: &Value) -> CoreResult<()> {
    if !value.is_null() && decl.value_type.admits(value) {
        Ok(())
    } else {
        Err(
            CoreError::invalid_value(format!("{} does not admit {value}", decl.name))
                .with_slot(decl.slot),
        )
    }
}

/// Shared state of the complex field views.
#[derive(Clone)]
struct FieldRef {
    txn: Arc<Transaction>,
    id: EntityId,
    slot: StorageSlot,
}

impl FieldRef {
    fn key(&self, element: &Value) -> Vec<u8> {
        element_key(self.id, self.slot, element)
    }

    /// Every `(element, stored value)` pair in key order.
    fn entries(&self) -> ViewIter<'_, (Value, Vec<u8>)> {
        let prefix = field_key(self.id, self.slot);
        let entries = match self.txn.raw_scan(&prefix) {
            Ok(entries) => entries,
            Err(err) => return Box::new(std::iter::once(Err(err))),
        };
        Box::new(entries.into_iter().map(move |(key, value)| -> CoreResult<_> {
            let element = decode_value(&key[prefix.len()..])?;
            Ok((element, value))
        }))
    }
}

impl fmt::Debug for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("txn", &self.txn.id())
            .field("entity", &self.id)
            .field("slot", &self.slot)
            .finish()
    }
}

/// A set field of one entity.
///
/// Reads and writes go straight to the transaction.
#[derive(Debug, Clone)]
pub struct FieldSet {
    field: FieldRef,
    element: SubFieldDecl,
}

impl FieldSet {
    pub(crate) fn new(
        txn: Arc<Transaction>,
        id: EntityId,
        slot: StorageSlot,
        element: SubFieldDecl,
    ) -> Self {
        Self {
            field: FieldRef { txn, id, slot },
            element,
        }
    }

    /// The element sub-field.
    pub fn element(&self) -> &SubFieldDecl {
        &self.element
    }
}

impl SetView<Value> for FieldSet {
    fn iter(&self) -> ViewIter<'_, Value> {
        Box::new(self.field.entries().map(|entry| entry.map(|(e, _)| e)))
    }

    fn contains(&self, value: &Value) -> CoreResult<bool> {
        Ok(self.field.txn.raw_get(&self.field.key(value))?.is_some())
    }

    fn insert(&self, value: Value) -> CoreResult<bool> {
        check(&self.element, &value)?;
        if self.contains(&value)? {
            return Ok(false);
        }
        self.field.txn.raw_put(&self.field.key(&value), &[])?;
        self.field
            .txn
            .index_element(self.element.slot, &value, self.field.id, true)?;
        Ok(true)
    }

    fn remove(&self, value: &Value) -> CoreResult<bool> {
        if !self.field.txn.raw_remove(&self.field.key(value))? {
            return Ok(false);
        }
        self.field
            .txn
            .index_element(self.element.slot, value, self.field.id, false)?;
        Ok(true)
    }
}

/// A list field of one entity.
#[derive(Debug, Clone)]
pub struct FieldList {
    field: FieldRef,
    element: SubFieldDecl,
}

#[allow(clippy::cast_possible_wrap)]
fn position(index: usize) -> Value {
    Value::Integer(index as i64)
}

impl FieldList {
    pub(crate) fn new(
        txn: Arc<Transaction>,
        id: EntityId,
        slot: StorageSlot,
        element: SubFieldDecl,
    ) -> Self {
        Self {
            field: FieldRef { txn, id, slot },
            element,
        }
    }

    /// The element sub-field.
    pub fn element(&self) -> &SubFieldDecl {
        &self.element
    }

    /// Removes every element.
    pub fn clear(&self) -> CoreResult<()> {
        let prefix = field_key(self.field.id, self.field.slot);
        for (key, _) in self.field.txn.raw_scan(&prefix)? {
            self.field.txn.raw_remove(&key)?;
        }
        Ok(())
    }
}

impl ListView<Value> for FieldList {
    fn iter(&self) -> ViewIter<'_, Value> {
        Box::new(self.field.entries().map(|entry| -> CoreResult<Value> {
            let (_, bytes) = entry?;
            Ok(decode_value(&bytes)?)
        }))
    }

    fn get(&self, index: usize) -> CoreResult<Option<Value>> {
        self.field.txn.read_value(&self.field.key(&position(index)))
    }

    fn push(&self, value: Value) -> CoreResult<()> {
        check(&self.element, &value)?;
        let next = self.len()?;
        self.field
            .txn
            .write_value(&self.field.key(&position(next)), &value)
    }

    fn set(&self, index: usize, value: Value) -> CoreResult<Value> {
        check(&self.element, &value)?;
        let key = self.field.key(&position(index));
        let old = self.field.txn.read_value(&key)?.ok_or_else(|| {
            CoreError::invalid_operation(format!("list position {index} is out of bounds"))
        })?;
        self.field.txn.write_value(&key, &value)?;
        Ok(old)
    }
}

/// A map field of one entity.
#[derive(Debug, Clone)]
pub struct FieldMap {
    field: FieldRef,
    key: SubFieldDecl,
    value: SubFieldDecl,
}

impl FieldMap {
    pub(crate) fn new(
        txn: Arc<Transaction>,
        id: EntityId,
        slot: StorageSlot,
        key: SubFieldDecl,
        value: SubFieldDecl,
    ) -> Self {
        Self {
            field: FieldRef { txn, id, slot },
            key,
            value,
        }
    }

    /// The key sub-field.
    pub fn key_field(&self) -> &SubFieldDecl {
        &self.key
    }

    /// The value sub-field.
    pub fn value_field(&self) -> &SubFieldDecl {
        &self.value
    }
}

impl MapView<Value, Value> for FieldMap {
    fn iter(&self) -> ViewIter<'_, (Value, Value)> {
        Box::new(self.field.entries().map(|entry| -> CoreResult<(Value, Value)> {
            let (key, bytes) = entry?;
            Ok((key, decode_value(&bytes)?))
        }))
    }

    fn get(&self, key: &Value) -> CoreResult<Option<Value>> {
        self.field.txn.read_value(&self.field.key(key))
    }

    fn put(&self, key: Value, value: Value) -> CoreResult<Option<Value>> {
        check(&self.key, &key)?;
        check(&self.value, &value)?;
        let stored = self.field.key(&key);
        let old = self.field.txn.read_value(&stored)?;
        self.field.txn.write_value(&stored, &value)?;
        if old.is_none() {
            self.field
                .txn
                .index_element(self.key.slot, &key, self.field.id, true)?;
        }
        Ok(old)
    }

    fn remove(&self, key: &Value) -> CoreResult<Option<Value>> {
        let stored = self.field.key(key);
        let Some(old) = self.field.txn.read_value(&stored)? else {
            return Ok(None);
        };
        self.field.txn.raw_remove(&stored)?;
        self.field
            .txn
            .index_element(self.key.slot, key, self.field.id, false)?;
        Ok(Some(old))
    }
}
