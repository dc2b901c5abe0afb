//! Component-wise tuple converters and row adapters.

use super::Converter;
use crate::error::{CoreError, CoreResult};
use modeldb_codec::Value;

macro_rules! tuple_converter {
    ($(#[$doc:meta])* $name:ident; $($c:ident $a:ident $b:ident $idx:tt),+) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name<$($c),+>($(pub $c),+);

        impl<$($a, $b, $c: Converter<$a, $b>),+> Converter<($($a,)+), ($($b,)+)> for $name<$($c),+> {
            fn forward(&self, value: &($($a,)+)) -> CoreResult<($($b,)+)> {
                Ok(($(self.$idx.forward(&value.$idx)?,)+))
            }

            fn backward(&self, value: &($($b,)+)) -> CoreResult<($($a,)+)> {
                Ok(($(self.$idx.backward(&value.$idx)?,)+))
            }
        }
    };
}

tuple_converter!(
    /// Converts pairs component-wise.
    Tuple2Converter; C1 A1 B1 0, C2 A2 B2 1
);
tuple_converter!(
    /// Converts triples component-wise.
    Tuple3Converter; C1 A1 B1 0, C2 A2 B2 1, C3 A3 B3 2
);
tuple_converter!(
    /// Converts 4-tuples component-wise.
    Tuple4Converter; C1 A1 B1 0, C2 A2 B2 1, C3 A3 B3 2, C4 A4 B4 3
);
tuple_converter!(
    /// Converts 5-tuples component-wise.
    Tuple5Converter; C1 A1 B1 0, C2 A2 B2 1, C3 A3 B3 2, C4 A4 B4 3, C5 A5 B5 4
);

fn arity_mismatch(expected: usize, found: usize) -> CoreError {
    CoreError::invalid_value(format!("expected a row of {expected} values, found {found}"))
}

macro_rules! row_adapter {
    (@value $v:ident) => { Value };
    ($(#[$doc:meta])* $name:ident, $len:literal; $($v:ident $idx:tt),+) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name;

        impl Converter<($(row_adapter!(@value $v),)+), Vec<Value>> for $name {
            fn forward(&self, value: &($(row_adapter!(@value $v),)+)) -> CoreResult<Vec<Value>> {
                Ok(vec![$(value.$idx.clone()),+])
            }

            fn backward(&self, value: &Vec<Value>) -> CoreResult<($(row_adapter!(@value $v),)+)> {
                match value.as_slice() {
                    [$($v),+] => Ok(($($v.clone(),)+)),
                    other => Err(arity_mismatch($len, other.len())),
                }
            }
        }
    };
}

/// Adapts a single value to a one-element row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Row1;

impl Converter<Value, Vec<Value>> for Row1 {
    fn forward(&self, value: &Value) -> CoreResult<Vec<Value>> {
        Ok(vec![value.clone()])
    }

    fn backward(&self, value: &Vec<Value>) -> CoreResult<Value> {
        match value.as_slice() {
            [v] => Ok(v.clone()),
            other => Err(arity_mismatch(1, other.len())),
        }
    }
}

row_adapter!(
    /// Adapts a pair of values to a row.
    Row2, 2; a 0, b 1
);
row_adapter!(
    /// Adapts a triple of values to a row.
    Row3, 3; a 0, b 1, c 2
);
row_adapter!(
    /// Adapts a 4-tuple of values to a row.
    Row4, 4; a 0, b 1, c 2, d 3
);
row_adapter!(
    /// Adapts a 5-tuple of values to a row.
    Row5, 5; a 0, b 1, c 2, d 3, e 4
);
