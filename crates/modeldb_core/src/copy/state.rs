//! Copy sessions.

use crate::entity::EntityId;
use std::collections::BTreeMap;

/// Entities already copied, mapped to the ID they were copied onto.
///
/// A state may span many [`CopyEngine::copy`](super::CopyEngine::copy)
/// calls. It only grows: every entry is a promise that the destination
/// transaction holds the copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyState {
    copied: BTreeMap<EntityId, EntityId>,
}

impl CopyState {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn mark(&mut self, source: EntityId, destination: EntityId) {
        self.copied.insert(source, destination);
    }

    /// The ID `source` was copied onto, if it was copied.
    #[must_use]
    pub fn destination_of(&self, source: EntityId) -> Option<EntityId> {
        self.copied.get(&source).copied()
    }

    /// Returns true if `source` was copied in this session.
    #[must_use]
    pub fn is_copied(&self, source: EntityId) -> bool {
        self.copied.contains_key(&source)
    }

    /// Number of copied entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.copied.len()
    }

    /// Returns true if nothing was copied yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.copied.is_empty()
    }

    /// Iterates `(source, destination)` pairs in source ID order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, EntityId)> + '_ {
        self.copied.iter().map(|(s, d)| (*s, *d))
    }
}
