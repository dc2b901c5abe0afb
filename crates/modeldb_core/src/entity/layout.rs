//! Key layout of entities and index rows in the ordered store.
//!
//! ```text
//! entity marker  0x10 | id
//! simple field   0x10 | id | slot            -> enc(value)
//! counter        0x10 | id | slot            -> enc(integer)
//! set element    0x10 | id | slot | enc(e)   -> empty
//! list element   0x10 | id | slot | enc(i)   -> enc(value)
//! map entry      0x10 | id | slot | enc(k)   -> enc(value)
//! index row      0x20 | slot | enc(v1) .. enc(vN) | enc(target)
//! ```

use crate::entity::EntityId;
use crate::types::StorageSlot;
use modeldb_codec::{KeyEncoder, Value};

pub(crate) const ENTITY_TAG: u8 = 0x10;
pub(crate) const INDEX_TAG: u8 = 0x20;

/// Length of an entity marker key.
pub(crate) const ENTITY_KEY_LEN: usize = 17;

pub(crate) fn entity_key(id: EntityId) -> Vec<u8> {
    let mut key = Vec::with_capacity(ENTITY_KEY_LEN);
    key.push(ENTITY_TAG);
    key.extend_from_slice(id.as_bytes());
    key
}

/// Prefix shared by every entity of one model type.
pub(crate) fn type_prefix(type_slot: StorageSlot) -> Vec<u8> {
    let mut key = Vec::with_capacity(5);
    key.push(ENTITY_TAG);
    key.extend_from_slice(&type_slot.to_be_bytes());
    key
}

pub(crate) fn field_key(id: EntityId, slot: StorageSlot) -> Vec<u8> {
    let mut key = entity_key(id);
    key.extend_from_slice(&slot.to_be_bytes());
    key
}

pub(crate) fn element_key(id: EntityId, slot: StorageSlot, element: &Value) -> Vec<u8> {
    let mut encoder = KeyEncoder::with_capacity(32);
    encoder.raw(&field_key(id, slot)).encode(element);
    encoder.into_bytes()
}

pub(crate) fn index_prefix(slot: StorageSlot) -> Vec<u8> {
    let mut key = Vec::with_capacity(5);
    key.push(INDEX_TAG);
    key.extend_from_slice(&slot.to_be_bytes());
    key
}

pub(crate) fn index_key(slot: StorageSlot, columns: &[Value], target: EntityId) -> Vec<u8> {
    let mut encoder = KeyEncoder::with_capacity(32);
    encoder.raw(&index_prefix(slot));
    for column in columns {
        encoder.encode(column);
    }
    encoder.encode(&Value::Reference(*target.as_bytes()));
    encoder.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_keys_extend_entity_key() {
        let id = EntityId::new(StorageSlot::new(3));
        let entity = entity_key(id);
        let field = field_key(id, StorageSlot::new(10));
        assert!(field.starts_with(&entity));
        assert!(entity.starts_with(&type_prefix(StorageSlot::new(3))));
        assert_eq!(entity.len(), ENTITY_KEY_LEN);
    }

    #[test]
    fn index_keys_sort_by_columns_then_target() {
        let slot = StorageSlot::new(30);
        let low = EntityId::from_bytes([0; 16]);
        let high = EntityId::from_bytes([1; 16]);
        let a = index_key(slot, &[Value::Integer(1)], high);
        let b = index_key(slot, &[Value::Integer(2)], low);
        let c = index_key(slot, &[Value::Integer(2)], high);
        assert!(a < b);
        assert!(b < c);
        assert!(a.starts_with(&index_prefix(slot)));
    }
}
