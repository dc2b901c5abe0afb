//! Enum converters.

use super::Converter;
use crate::error::{CoreError, CoreResult};
use crate::schema::{EnumDef, EnumValue};
use std::marker::PhantomData;

/// A Rust enum stored as a schema enum.
///
/// Ordinals follow the order of [`ModelEnum::variants`].
pub trait ModelEnum: Copy + Eq + Send + Sync + 'static {
    /// Name of the schema enum.
    const NAME: &'static str;

    /// Every variant, in ordinal order.
    fn variants() -> &'static [Self];

    /// The constant name of a variant.
    fn name(self) -> &'static str;

    /// The ordinal of a variant.
    #[allow(clippy::cast_possible_truncation)]
    fn ordinal(self) -> u32 {
        Self::variants()
            .iter()
            .position(|v| *v == self)
            .unwrap_or_default() as u32
    }

    /// Looks up a variant by ordinal.
    fn from_ordinal(ordinal: u32) -> Option<Self> {
        Self::variants().get(ordinal as usize).copied()
    }

    /// The matching schema enum definition.
    fn enum_def() -> EnumDef {
        EnumDef::new(Self::NAME, Self::variants().iter().map(|v| v.name()))
    }
}

/// Converts a [`ModelEnum`] to and from an [`EnumValue`].
pub struct ModelEnumConverter<E>(PhantomData<fn() -> E>);

impl<E> ModelEnumConverter<E> {
    /// Creates the converter.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E> Default for ModelEnumConverter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for ModelEnumConverter<E> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for ModelEnumConverter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ModelEnumConverter<{}>", std::any::type_name::<E>())
    }
}

impl<E: ModelEnum> Converter<E, EnumValue> for ModelEnumConverter<E> {
    fn forward(&self, value: &E) -> CoreResult<EnumValue> {
        Ok(EnumValue::new(value.ordinal(), value.name()))
    }

    fn backward(&self, value: &EnumValue) -> CoreResult<E> {
        E::from_ordinal(value.ordinal)
            .filter(|variant| variant.name() == value.name)
            .ok_or_else(|| {
                CoreError::invalid_value(format!("{value} is not a constant of {}", E::NAME))
            })
    }
}

/// Maps constants of one enum definition onto another by name.
///
/// Used when the same enum is declared differently by two schemas.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumDefConverter {
    source: EnumDef,
    target: EnumDef,
}

impl EnumDefConverter {
    /// Creates a converter from `source` constants to `target` constants.
    #[must_use]
    pub fn new(source: EnumDef, target: EnumDef) -> Self {
        Self { source, target }
    }
}

fn remap(from: &EnumDef, to: &EnumDef, value: &EnumValue) -> CoreResult<EnumValue> {
    if !from.contains(value) {
        return Err(CoreError::invalid_value(format!(
            "{value} (ordinal {}) is not a constant of {}",
            value.ordinal,
            from.name()
        )));
    }
    to.value(&value.name).ok_or_else(|| {
        CoreError::invalid_value(format!("{value} is not a constant of {}", to.name()))
    })
}

impl Converter<EnumValue, EnumValue> for EnumDefConverter {
    fn forward(&self, value: &EnumValue) -> CoreResult<EnumValue> {
        remap(&self.source, &self.target, value)
    }

    fn backward(&self, value: &EnumValue) -> CoreResult<EnumValue> {
        remap(&self.target, &self.source, value)
    }
}
