//! Live handle references.

use super::Converter;
use crate::cache::EntityCache;
use crate::entity::{AccessorFactory, EntityId, LiveHandle};
use crate::error::{CoreError, CoreResult};
use modeldb_codec::Value;
use std::sync::Arc;

/// Converts live handles to stored references and back.
///
/// Reading a reference resolves it through the transaction's identity
/// cache, so the same stored reference always yields the same handle.
pub struct ReferenceConverter<F: AccessorFactory> {
    cache: Arc<EntityCache<F>>,
}

impl<F: AccessorFactory> ReferenceConverter<F> {
    /// Creates a converter resolving through `cache`.
    #[must_use]
    pub fn new(cache: Arc<EntityCache<F>>) -> Self {
        Self { cache }
    }
}

impl<F: AccessorFactory> Clone for ReferenceConverter<F> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<F: AccessorFactory> Converter<Arc<F::Handle>, Value> for ReferenceConverter<F> {
    fn forward(&self, value: &Arc<F::Handle>) -> CoreResult<Value> {
        Ok(Value::Reference(*value.entity_id().as_bytes()))
    }

    fn backward(&self, value: &Value) -> CoreResult<Arc<F::Handle>> {
        match value {
            Value::Reference(bytes) => self.cache.get(EntityId::from_bytes(*bytes)),
            other => Err(CoreError::invalid_value(format!(
                "expected reference, found {}",
                other.kind_name()
            ))),
        }
    }
}
