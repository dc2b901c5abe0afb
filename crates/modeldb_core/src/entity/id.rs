//! Entity identifier.

use crate::types::StorageSlot;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an entity.
///
/// Entity IDs are 128-bit values that are:
/// - Prefixed by the big-endian storage slot of the entity's model type
/// - Filled with twelve random bytes
/// - Immutable once assigned and never reused
///
/// Byte order equals store key order, so all entities of one model type
/// are contiguous in the store.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId([u8; 16]);

impl EntityId {
    /// Creates an entity ID from raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Creates a new random entity ID for the given model type.
    #[must_use]
    pub fn new(type_slot: StorageSlot) -> Self {
        let random = Uuid::new_v4().into_bytes();
        let mut bytes = [0u8; 16];
        bytes[..4].copy_from_slice(&type_slot.to_be_bytes());
        bytes[4..].copy_from_slice(&random[4..]);
        Self(bytes)
    }

    /// Returns the storage slot of the entity's model type.
    #[must_use]
    pub fn type_slot(&self) -> StorageSlot {
        StorageSlot::new(u32::from_be_bytes([
            self.0[0], self.0[1], self.0[2], self.0[3],
        ]))
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Creates an entity ID from a slice.
    ///
    /// Returns `None` if the slice is not exactly 16 bytes.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 16]>::try_from(slice).ok().map(Self)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({self})")
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_bytes(self.0).simple())
    }
}

impl From<[u8; 16]> for EntityId {
    fn from(bytes: [u8; 16]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<EntityId> for [u8; 16] {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_unique() {
        let slot = StorageSlot::new(1);
        assert_ne!(EntityId::new(slot), EntityId::new(slot));
    }

    #[test]
    fn new_carries_type_slot() {
        let id = EntityId::new(StorageSlot::new(0x0102_0304));
        assert_eq!(id.type_slot(), StorageSlot::new(0x0102_0304));
        assert_eq!(&id.as_bytes()[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn from_slice() {
        assert!(EntityId::from_slice(&[0u8; 16]).is_some());
        assert!(EntityId::from_slice(&[0u8; 15]).is_none());
        assert!(EntityId::from_slice(&[0u8; 17]).is_none());
    }

    #[test]
    fn ordering_groups_by_type() {
        let a = EntityId::new(StorageSlot::new(1));
        let b = EntityId::new(StorageSlot::new(2));
        assert!(a < b);
    }

    #[test]
    fn display_is_hex() {
        let id = EntityId::from_bytes([0xab; 16]);
        assert_eq!(id.to_string(), "ab".repeat(16));
    }
}
