//! Invertible, order-preserving value converters.
//!
//! A [`Converter<A, B>`] maps values of `A` onto `B` and back. For every
//! value `x` in its domain `backward(forward(x)) == x`, and the mapping
//! preserves order: `cmp(forward(a), forward(b)) == cmp(a, b)`. Values
//! outside the domain fail with `InvalidValue`; nothing is coerced.
//!
//! Converters compose:
//!
//! - [`Converter::then`] chains `A <-> B` with `B <-> C`
//! - [`Converter::reverse`] flips a converter around
//! - `Tuple2Converter` .. `Tuple5Converter` convert tuples component-wise
//! - [`SetViewConverter`], [`MapViewConverter`] and [`ListViewConverter`]
//!   lift element converters to whole collection views
//!
//! ```rust
//! use modeldb_codec::Value;
//! use modeldb_core::convert::{Converter, Row2, Tuple2Converter, ValueConverter};
//!
//! let row = Tuple2Converter(ValueConverter::<i64>::new(), ValueConverter::<String>::new())
//!     .then(Row2);
//! let stored = row.forward(&(7, "x".to_string())).unwrap();
//! assert_eq!(stored, vec![Value::Integer(7), Value::text("x")]);
//! assert_eq!(row.backward(&stored).unwrap(), (7, "x".to_string()));
//! ```

mod collection;
mod enums;
mod reference;
mod tuple;
mod value;

pub use collection::{ListViewConverter, MapViewConverter, SetViewConverter};
pub use enums::{EnumDefConverter, ModelEnum, ModelEnumConverter};
pub use reference::ReferenceConverter;
pub use tuple::{
    Row1, Row2, Row3, Row4, Row5, Tuple2Converter, Tuple3Converter, Tuple4Converter,
    Tuple5Converter,
};
pub use value::{FieldValue, NullableConverter, ValueConverter};

use crate::error::CoreResult;
use std::marker::PhantomData;
use std::sync::Arc;

/// A paired invertible mapping between `A` and `B`.
pub trait Converter<A, B>: Send + Sync {
    /// Maps a value of `A` onto `B`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if `value` is outside the domain.
    fn forward(&self, value: &A) -> CoreResult<B>;

    /// Maps a value of `B` back onto `A`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if `value` is outside the range.
    fn backward(&self, value: &B) -> CoreResult<A>;

    /// Chains this converter with one from `B` onward.
    fn then<C>(self, next: C) -> Chained<Self, C, B>
    where
        Self: Sized,
    {
        Chained {
            first: self,
            second: next,
            middle: PhantomData,
        }
    }

    /// Returns the inverse converter.
    fn reverse(self) -> Reversed<Self>
    where
        Self: Sized,
    {
        Reversed(self)
    }
}

impl<A, B, C> Converter<A, B> for Arc<C>
where
    C: Converter<A, B> + ?Sized,
{
    fn forward(&self, value: &A) -> CoreResult<B> {
        (**self).forward(value)
    }

    fn backward(&self, value: &B) -> CoreResult<A> {
        (**self).backward(value)
    }
}

/// The identity converter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Identity;

impl<T: Clone> Converter<T, T> for Identity {
    fn forward(&self, value: &T) -> CoreResult<T> {
        Ok(value.clone())
    }

    fn backward(&self, value: &T) -> CoreResult<T> {
        Ok(value.clone())
    }
}

/// A converter run backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reversed<C>(pub C);

impl<A, B, C: Converter<A, B>> Converter<B, A> for Reversed<C> {
    fn forward(&self, value: &B) -> CoreResult<A> {
        self.0.backward(value)
    }

    fn backward(&self, value: &A) -> CoreResult<B> {
        self.0.forward(value)
    }
}

/// Two converters applied in sequence through an intermediate type `B`.
pub struct Chained<C1, C2, B> {
    first: C1,
    second: C2,
    middle: PhantomData<fn() -> B>,
}

impl<A, B, X, C1, C2> Converter<A, X> for Chained<C1, C2, B>
where
    C1: Converter<A, B>,
    C2: Converter<B, X>,
{
    fn forward(&self, value: &A) -> CoreResult<X> {
        self.second.forward(&self.first.forward(value)?)
    }

    fn backward(&self, value: &X) -> CoreResult<A> {
        self.first.backward(&self.second.backward(value)?)
    }
}

impl<C1: Clone, C2: Clone, B> Clone for Chained<C1, C2, B> {
    fn clone(&self) -> Self {
        Self {
            first: self.first.clone(),
            second: self.second.clone(),
            middle: PhantomData,
        }
    }
}

impl<C1: PartialEq, C2: PartialEq, B> PartialEq for Chained<C1, C2, B> {
    fn eq(&self, other: &Self) -> bool {
        self.first == other.first && self.second == other.second
    }
}

impl<C1: Eq, C2: Eq, B> Eq for Chained<C1, C2, B> {}

impl<C1: std::fmt::Debug, C2: std::fmt::Debug, B> std::fmt::Debug for Chained<C1, C2, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chained")
            .field("first", &self.first)
            .field("second", &self.second)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modeldb_codec::Value;

    #[test]
    fn identity_round_trips() {
        assert_eq!(Converter::<i64, i64>::forward(&Identity, &5).unwrap(), 5);
    }

    #[test]
    fn reverse_swaps_directions() {
        let conv = ValueConverter::<i64>::new().reverse();
        assert_eq!(conv.forward(&Value::Integer(3)).unwrap(), 3);
        assert_eq!(conv.backward(&3).unwrap(), Value::Integer(3));
    }

    #[test]
    fn chain_fails_on_invalid_intermediate() {
        let conv = ValueConverter::<i64>::new().reverse().then(ValueConverter::<i64>::new());
        assert_eq!(conv.forward(&Value::Integer(1)).unwrap(), Value::Integer(1));
        assert!(conv.forward(&Value::text("1")).is_err());
    }

    #[test]
    fn arc_converter_delegates() {
        let conv: Arc<dyn Converter<bool, Value>> = Arc::new(ValueConverter::<bool>::new());
        assert_eq!(conv.forward(&true).unwrap(), Value::Bool(true));
    }
}
