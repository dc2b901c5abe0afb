//! Error types for ModelDB core.

use crate::entity::EntityId;
use crate::types::{StorageSlot, TransactionId};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// A boxed error produced by an external collaborator such as an accessor
/// factory.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in ModelDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] modeldb_storage::StorageError),

    /// Key codec error.
    #[error("codec error: {0}")]
    Codec(#[from] modeldb_codec::CodecError),

    /// A value lies outside the domain of a converter or field type.
    #[error("invalid value{}: {message}", at_slot(.slot))]
    InvalidValue {
        /// The field or sub-field slot involved, if known.
        slot: Option<StorageSlot>,
        /// Description of the problem.
        message: String,
    },

    /// Field declarations or layouts are incompatible.
    #[error("schema mismatch{}{}: {message}", for_entity(.entity_id), at_slot(.slot))]
    SchemaMismatch {
        /// The entity whose layout was compared, if any.
        entity_id: Option<EntityId>,
        /// The field slot involved, if known.
        slot: Option<StorageSlot>,
        /// Description of the mismatch.
        message: String,
    },

    /// The accessor factory failed to build a live handle.
    #[error("failed to construct handle for entity {entity_id}: {source}")]
    EntityConstructionFailed {
        /// The entity being constructed.
        entity_id: EntityId,
        /// The underlying cause.
        #[source]
        source: BoxError,
    },

    /// A different handle is already registered for the entity.
    #[error("conflicting handle registration for entity {entity_id}")]
    ConflictingRegistration {
        /// The entity being registered.
        entity_id: EntityId,
    },

    /// The copy state claims an entity was copied but the destination lacks it.
    #[error("entity {entity_id} is marked copied but missing from the destination")]
    InconsistentCopyState {
        /// The source entity marked as copied.
        entity_id: EntityId,
    },

    /// The root entity of a copy does not exist in the source transaction.
    #[error("copy source entity {entity_id} does not exist")]
    SourceEntityMissing {
        /// The requested root entity.
        entity_id: EntityId,
    },

    /// The transaction has already committed or rolled back.
    #[error("transaction {txn_id} is no longer active")]
    StaleTransaction {
        /// The closed transaction.
        txn_id: TransactionId,
    },

    /// Entity not found.
    #[error("entity not found: {entity_id}")]
    EntityNotFound {
        /// The entity ID that was not found.
        entity_id: EntityId,
    },

    /// No index relation exists under the slot.
    #[error("unknown index: {slot}")]
    UnknownIndex {
        /// The requested index slot.
        slot: StorageSlot,
    },

    /// A reference path names a slot that does not hold references.
    #[error("invalid reference path at {slot}: {message}")]
    InvalidReferencePath {
        /// The offending path slot.
        slot: StorageSlot,
        /// Description of the problem.
        message: String,
    },

    /// Write attempted through a read-only view.
    #[error("view is read-only")]
    ReadOnlyView,

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

fn at_slot(slot: &Option<StorageSlot>) -> String {
    slot.map(|s| format!(" at {s}")).unwrap_or_default()
}

fn for_entity(entity_id: &Option<EntityId>) -> String {
    entity_id
        .map(|id| format!(" for entity {id}"))
        .unwrap_or_default()
}

impl CoreError {
    /// Creates an invalid value error.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            slot: None,
            message: message.into(),
        }
    }

    /// Creates a schema mismatch error.
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            entity_id: None,
            slot: None,
            message: message.into(),
        }
    }

    /// Creates an entity construction failure.
    pub fn construction_failed(entity_id: EntityId, source: impl Into<BoxError>) -> Self {
        Self::EntityConstructionFailed {
            entity_id,
            source: source.into(),
        }
    }

    /// Creates an invalid reference path error.
    pub fn invalid_reference_path(slot: StorageSlot, message: impl Into<String>) -> Self {
        Self::InvalidReferencePath {
            slot,
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Attaches a slot to value and schema errors that lack one.
    #[must_use]
    pub fn with_slot(mut self, at: StorageSlot) -> Self {
        match &mut self {
            Self::InvalidValue { slot, .. } | Self::SchemaMismatch { slot, .. } => {
                slot.get_or_insert(at);
            }
            _ => {}
        }
        self
    }

    /// Attaches an entity to schema errors that lack one.
    #[must_use]
    pub fn with_entity(mut self, id: EntityId) -> Self {
        if let Self::SchemaMismatch { entity_id, .. } = &mut self {
            entity_id.get_or_insert(id);
        }
        self
    }
}
