//! Index row maintenance.
//!
//! Every entity has exactly one row in the relation of each indexed
//! simple field and each composite index covering its type, starting out
//! with `Null` columns. Indexed set elements and map keys have one row per
//! element.

use super::txn::Transaction;
use crate::entity::layout::{field_key, index_key};
use crate::entity::EntityId;
use crate::error::{CoreError, CoreResult};
use crate::schema::{FieldKind, IndexDecl, ModelType};
use crate::types::StorageSlot;
use modeldb_codec::{decode_value, Value};
use tracing::trace;

impl Transaction {
    fn is_value_indexed(&self, slot: StorageSlot) -> bool {
        self.schema()
            .field_infos()
            .field(slot)
            .is_some_and(|info| info.is_value_indexed())
    }

    pub(crate) fn is_sub_field_indexed(&self, slot: StorageSlot) -> bool {
        self.schema()
            .field_infos()
            .sub_field(slot)
            .is_some_and(|(sub, _)| sub.is_indexed())
    }

    fn put_row(&self, index: StorageSlot, columns: &[Value], id: EntityId) -> CoreResult<()> {
        trace!(target: "modeldb::index", %index, entity = %id, "insert row");
        self.raw_put(&index_key(index, columns, id), &[])
    }

    fn remove_row(&self, index: StorageSlot, columns: &[Value], id: EntityId) -> CoreResult<()> {
        trace!(target: "modeldb::index", %index, entity = %id, "remove row");
        self.raw_remove(&index_key(index, columns, id)).map(|_| ())
    }

    /// Current columns of `index` for `id`, with `slot` replaced by
    /// `value` if given.
    fn composite_row(
        &self,
        id: EntityId,
        index: &IndexDecl,
        replace: Option<(StorageSlot, &Value)>,
    ) -> CoreResult<Vec<Value>> {
        index
            .fields
            .iter()
            .map(|&column| match replace {
                Some((slot, value)) if slot == column => Ok(value.clone()),
                _ => Ok(self
                    .read_value(&field_key(id, column))?
                    .unwrap_or(Value::Null)),
            })
            .collect()
    }

    pub(super) fn insert_initial_rows(&self, id: EntityId, ty: &ModelType) -> CoreResult<()> {
        for decl in &ty.fields {
            if decl.kind.value_type().is_some() && self.is_value_indexed(decl.slot) {
                self.put_row(decl.slot, &[Value::Null], id)?;
            }
        }
        for index in self.schema().indexes_for(ty) {
            self.put_row(index.slot, &vec![Value::Null; index.fields.len()], id)?;
        }
        Ok(())
    }

    pub(super) fn remove_all_rows(&self, id: EntityId, ty: &ModelType) -> CoreResult<()> {
        for index in self.schema().indexes_for(ty) {
            let row = self.composite_row(id, index, None)?;
            self.remove_row(index.slot, &row, id)?;
        }
        for decl in &ty.fields {
            match &decl.kind {
                FieldKind::Simple(_) | FieldKind::Enum(_) | FieldKind::Reference(_) => {
                    if self.is_value_indexed(decl.slot) {
                        let value = self
                            .read_value(&field_key(id, decl.slot))?
                            .unwrap_or(Value::Null);
                        self.remove_row(decl.slot, &[value], id)?;
                    }
                }
                FieldKind::Set(element) | FieldKind::Map { key: element, .. } => {
                    if self.is_sub_field_indexed(element.slot) {
                        for element_value in self.element_values(id, decl.slot)? {
                            self.remove_row(element.slot, &[element_value], id)?;
                        }
                    }
                }
                FieldKind::Counter | FieldKind::List(_) => {}
            }
        }
        Ok(())
    }

    /// Decoded element keys of a set or map field.
    pub(crate) fn element_values(&self, id: EntityId, slot: StorageSlot) -> CoreResult<Vec<Value>> {
        let prefix = field_key(id, slot);
        self.raw_scan(&prefix)?
            .into_iter()
            .filter(|(key, _)| key.len() > prefix.len())
            .map(|(key, _)| decode_value(&key[prefix.len()..]).map_err(CoreError::from))
            .collect()
    }

    pub(super) fn reindex_field(
        &self,
        id: EntityId,
        ty: &ModelType,
        slot: StorageSlot,
        old: &Value,
        new: &Value,
    ) -> CoreResult<()> {
        if self.is_value_indexed(slot) {
            self.remove_row(slot, std::slice::from_ref(old), id)?;
            self.put_row(slot, std::slice::from_ref(new), id)?;
        }
        for index in self.schema().indexes_for(ty) {
            if !index.fields.contains(&slot) {
                continue;
            }
            let before = self.composite_row(id, index, Some((slot, old)))?;
            let after = self.composite_row(id, index, Some((slot, new)))?;
            self.remove_row(index.slot, &before, id)?;
            self.put_row(index.slot, &after, id)?;
        }
        Ok(())
    }

    /// Adds or removes the index row of one set element or map key.
    pub(crate) fn index_element(
        &self,
        sub_slot: StorageSlot,
        element: &Value,
        id: EntityId,
        present: bool,
    ) -> CoreResult<()> {
        if !self.is_sub_field_indexed(sub_slot) {
            return Ok(());
        }
        let columns = std::slice::from_ref(element);
        if present {
            self.put_row(sub_slot, columns, id)
        } else {
            self.remove_row(sub_slot, columns, id)
        }
    }
}
