//! Scalar converters between native values and storage values.

use super::Converter;
use crate::entity::EntityId;
use crate::error::{CoreError, CoreResult};
use crate::schema::EnumValue;
use modeldb_codec::Value;
use std::fmt;
use std::marker::PhantomData;

/// A native type with a fixed storage representation.
pub trait FieldValue: Clone + Send + Sync + 'static {
    /// Returns the storage representation.
    fn to_value(&self) -> Value;

    /// Parses the storage representation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if `value` has the wrong kind.
    fn from_value(value: &Value) -> CoreResult<Self>;
}

fn wrong_kind(expected: &str, value: &Value) -> CoreError {
    CoreError::invalid_value(format!("expected {expected}, found {}", value.kind_name()))
}

impl FieldValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> CoreResult<Self> {
        value.as_bool().ok_or_else(|| wrong_kind("bool", value))
    }
}

impl FieldValue for i64 {
    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(value: &Value) -> CoreResult<Self> {
        value.as_integer().ok_or_else(|| wrong_kind("integer", value))
    }
}

impl FieldValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> CoreResult<Self> {
        value
            .as_text()
            .map(ToString::to_string)
            .ok_or_else(|| wrong_kind("text", value))
    }
}

impl FieldValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_value(value: &Value) -> CoreResult<Self> {
        value
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| wrong_kind("bytes", value))
    }
}

impl FieldValue for EntityId {
    fn to_value(&self) -> Value {
        Value::Reference(*self.as_bytes())
    }

    fn from_value(value: &Value) -> CoreResult<Self> {
        value
            .as_reference()
            .map(|bytes| EntityId::from_bytes(*bytes))
            .ok_or_else(|| wrong_kind("reference", value))
    }
}

impl FieldValue for EnumValue {
    fn to_value(&self) -> Value {
        Value::enumeration(self.ordinal, self.name.clone())
    }

    fn from_value(value: &Value) -> CoreResult<Self> {
        match value {
            Value::Enum { ordinal, name } => Ok(EnumValue::new(*ordinal, name.clone())),
            other => Err(wrong_kind("enum", other)),
        }
    }
}

impl FieldValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: &Value) -> CoreResult<Self> {
        Ok(value.clone())
    }
}

/// Converts a [`FieldValue`] to and from its storage value.
pub struct ValueConverter<T>(PhantomData<fn() -> T>);

impl<T> ValueConverter<T> {
    /// Creates the converter.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for ValueConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ValueConverter<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ValueConverter<T> {}

impl<T> PartialEq for ValueConverter<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T> Eq for ValueConverter<T> {}

impl<T> std::hash::Hash for ValueConverter<T> {
    fn hash<H: std::hash::Hasher>(&self, _state: &mut H) {}
}

impl<T> fmt::Debug for ValueConverter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueConverter<{}>", std::any::type_name::<T>())
    }
}

impl<T: FieldValue> Converter<T, Value> for ValueConverter<T> {
    fn forward(&self, value: &T) -> CoreResult<Value> {
        Ok(value.to_value())
    }

    fn backward(&self, value: &Value) -> CoreResult<T> {
        T::from_value(value)
    }
}

/// Lifts a converter onto `Value` to optional values, mapping `None` to
/// [`Value::Null`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NullableConverter<C>(pub C);

impl<A, C: Converter<A, Value>> Converter<Option<A>, Value> for NullableConverter<C> {
    fn forward(&self, value: &Option<A>) -> CoreResult<Value> {
        match value {
            Some(inner) => self.0.forward(inner),
            None => Ok(Value::Null),
        }
    }

    fn backward(&self, value: &Value) -> CoreResult<Option<A>> {
        match value {
            Value::Null => Ok(None),
            other => self.0.backward(other).map(Some),
        }
    }
}
