//! Typed index views of arity 1 to 4.

use super::raw::RawIndex;
use crate::convert::{
    Chained, Converter, MapViewConverter, Row1, Row2, Row3, Row4, Row5, SetViewConverter,
    Tuple2Converter, Tuple3Converter, Tuple4Converter, Tuple5Converter,
};
use crate::error::{CoreError, CoreResult};
use crate::view::{ConvertedSet, MapRef, SetRef};
use modeldb_codec::Value;
use std::sync::Arc;

/// Converts one index column between its native type and `Value`.
pub type ColumnConverter<T> = Arc<dyn Converter<T, Value>>;

type C<T> = ColumnConverter<T>;
type Row1Of<A> = Chained<C<A>, Row1, Value>;
type Row2Of<A, B> = Chained<Tuple2Converter<C<A>, C<B>>, Row2, (Value, Value)>;
type Row3Of<A, B, D> = Chained<Tuple3Converter<C<A>, C<B>, C<D>>, Row3, (Value, Value, Value)>;
type Row4Of<A, B, D, E> =
    Chained<Tuple4Converter<C<A>, C<B>, C<D>, C<E>>, Row4, (Value, Value, Value, Value)>;
type Row5Of<A, B, D, E, G> = Chained<
    Tuple5Converter<C<A>, C<B>, C<D>, C<E>, C<G>>,
    Row5,
    (Value, Value, Value, Value, Value),
>;

fn row1<A>(a: &C<A>) -> Row1Of<A> {
    Converter::<A, Value>::then(Arc::clone(a), Row1)
}

fn row2<A, B>(a: &C<A>, b: &C<B>) -> Row2Of<A, B> {
    Converter::<(A, B), (Value, Value)>::then(Tuple2Converter(Arc::clone(a), Arc::clone(b)), Row2)
}

fn row3<A, B, D>(a: &C<A>, b: &C<B>, d: &C<D>) -> Row3Of<A, B, D> {
    Converter::<(A, B, D), (Value, Value, Value)>::then(
        Tuple3Converter(Arc::clone(a), Arc::clone(b), Arc::clone(d)),
        Row3,
    )
}

fn row4<A, B, D, E>(a: &C<A>, b: &C<B>, d: &C<D>, e: &C<E>) -> Row4Of<A, B, D, E> {
    Converter::<(A, B, D, E), (Value, Value, Value, Value)>::then(
        Tuple4Converter(Arc::clone(a), Arc::clone(b), Arc::clone(d), Arc::clone(e)),
        Row4,
    )
}

fn row5<A, B, D, E, G>(
    a: &C<A>,
    b: &C<B>,
    d: &C<D>,
    e: &C<E>,
    g: &C<G>,
) -> Row5Of<A, B, D, E, G> {
    Converter::<(A, B, D, E, G), (Value, Value, Value, Value, Value)>::then(
        Tuple5Converter(
            Arc::clone(a),
            Arc::clone(b),
            Arc::clone(d),
            Arc::clone(e),
            Arc::clone(g),
        ),
        Row5,
    )
}

/// Exposes a raw relation as the set it already is.
///
/// Raw relations are read-only, so a set cannot be turned back into one.
#[derive(Debug, Clone, Copy, Default)]
struct RawSet;

impl Converter<SetRef<Vec<Value>>, RawIndex> for RawSet {
    fn forward(&self, _value: &SetRef<Vec<Value>>) -> CoreResult<RawIndex> {
        Err(CoreError::ReadOnlyView)
    }

    fn backward(&self, value: &RawIndex) -> CoreResult<SetRef<Vec<Value>>> {
        Ok(Arc::new(value.clone()))
    }
}

/// Converts single-column relations into sets of converted targets.
fn target_sets<T: 'static>(
    target: &C<T>,
) -> Chained<SetViewConverter<Row1Of<T>>, RawSet, SetRef<Vec<Value>>> {
    Converter::<SetRef<T>, SetRef<Vec<Value>>>::then(SetViewConverter(row1(target)), RawSet)
}

fn flat<T: 'static, K>(raw: &RawIndex, rows: K) -> SetRef<T>
where
    K: Converter<T, Vec<Value>> + 'static,
{
    let inner: SetRef<Vec<Value>> = Arc::new(raw.clone());
    Arc::new(ConvertedSet::new(inner, rows))
}

fn grouped<K: 'static, V: 'static, KC, VC>(
    raw: &RawIndex,
    width: usize,
    keys: KC,
    values: VC,
) -> CoreResult<MapRef<K, V>>
where
    KC: Converter<K, Vec<Value>> + Clone + 'static,
    VC: Converter<V, RawIndex> + Clone + 'static,
{
    let inner: MapRef<Vec<Value>, RawIndex> = Arc::new(raw.grouped(width)?);
    MapViewConverter(keys, values).backward(&inner)
}

fn targets<K, T: 'static>(
    raw: &RawIndex,
    keys: &impl Converter<K, Vec<Value>>,
    key: &K,
    target: &C<T>,
) -> CoreResult<SetRef<T>> {
    let group = raw.restrict(&keys.forward(key)?)?;
    target_sets(target).backward(&group)
}

/// An index view that can be rebuilt from a raw relation and its columns.
pub trait TypedIndex: Sized + Send + Sync + 'static {
    /// Converters of the key columns followed by the target column.
    type Columns: Clone + Send + Sync + 'static;

    /// Number of key columns.
    const ARITY: usize;

    /// Wraps `raw` with `columns`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if `raw` does not expose `ARITY + 1`
    /// columns.
    fn from_parts(raw: RawIndex, columns: Self::Columns) -> CoreResult<Self>;

    /// The underlying relation.
    fn raw(&self) -> &RawIndex;
}

fn check_arity<I: TypedIndex>(raw: &RawIndex) -> CoreResult<()> {
    if raw.arity() == I::ARITY + 1 {
        Ok(())
    } else {
        Err(CoreError::invalid_operation(format!(
            "index of {} key columns over a relation of {} columns",
            I::ARITY,
            raw.arity()
        )))
    }
}

/// Converts raw relations into typed indexes sharing one set of columns.
pub struct IndexConverter<I: TypedIndex> {
    columns: I::Columns,
}

impl<I: TypedIndex> IndexConverter<I> {
    /// Creates a converter producing indexes with `columns`.
    pub fn new(columns: I::Columns) -> Self {
        Self { columns }
    }
}

impl<I: TypedIndex> Clone for IndexConverter<I> {
    fn clone(&self) -> Self {
        Self::new(self.columns.clone())
    }
}

impl<I: TypedIndex> Converter<I, RawIndex> for IndexConverter<I> {
    fn forward(&self, value: &I) -> CoreResult<RawIndex> {
        Ok(value.raw().clone())
    }

    fn backward(&self, value: &RawIndex) -> CoreResult<I> {
        I::from_parts(value.clone(), self.columns.clone())
    }
}

/// An index with one key column.
pub struct Index1<V1, T> {
    raw: RawIndex,
    columns: (C<V1>, C<T>),
}

/// An index with two key columns.
pub struct Index2<V1, V2, T> {
    raw: RawIndex,
    columns: (C<V1>, C<V2>, C<T>),
}

/// An index with three key columns.
pub struct Index3<V1, V2, V3, T> {
    raw: RawIndex,
    columns: (C<V1>, C<V2>, C<V3>, C<T>),
}

/// An index with four key columns.
pub struct Index4<V1, V2, V3, V4, T> {
    raw: RawIndex,
    columns: (C<V1>, C<V2>, C<V3>, C<V4>, C<T>),
}

macro_rules! typed_index {
    ($name:ident < $($v:ident),+ >, $arity:literal) => {
        impl<$($v: 'static),+> TypedIndex for $name<$($v),+> {
            type Columns = ($(C<$v>,)+);
            const ARITY: usize = $arity;

            fn from_parts(raw: RawIndex, columns: Self::Columns) -> CoreResult<Self> {
                check_arity::<Self>(&raw)?;
                Ok(Self { raw, columns })
            }

            fn raw(&self) -> &RawIndex {
                &self.raw
            }
        }

        impl<$($v),+> Clone for $name<$($v),+> {
            fn clone(&self) -> Self {
                Self {
                    raw: self.raw.clone(),
                    columns: self.columns.clone(),
                }
            }
        }

        impl<$($v),+> std::fmt::Debug for $name<$($v),+> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name)).field("raw", &self.raw).finish()
            }
        }
    };
}

typed_index!(Index1<V1, T>, 1);
typed_index!(Index2<V1, V2, T>, 2);
typed_index!(Index3<V1, V2, V3, T>, 3);
typed_index!(Index4<V1, V2, V3, V4, T>, 4);

impl<V1: 'static, T: 'static> Index1<V1, T> {
    /// Wraps a two-column relation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if `raw` has a different arity.
    pub fn new(raw: RawIndex, key: C<V1>, target: C<T>) -> CoreResult<Self> {
        Self::from_parts(raw, (key, target))
    }

    /// Every `(key, target)` row.
    pub fn as_flat_set(&self) -> SetRef<(V1, T)> {
        let (a, t) = &self.columns;
        flat(&self.raw, row2(a, t))
    }

    /// Targets grouped by key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the relation cannot be grouped.
    pub fn as_grouped_map(&self) -> CoreResult<MapRef<V1, SetRef<T>>> {
        let (a, t) = &self.columns;
        grouped(&self.raw, 1, row1(a), target_sets(t))
    }

    /// Targets stored under `key`; empty if there are none.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if `key` cannot be converted.
    pub fn targets(&self, key: &V1) -> CoreResult<SetRef<T>> {
        let (a, t) = &self.columns;
        targets(&self.raw, &row1(a), key, t)
    }
}

impl<V1: 'static, V2: 'static, T: 'static> Index2<V1, V2, T> {
    /// Wraps a three-column relation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if `raw` has a different arity.
    pub fn new(raw: RawIndex, first: C<V1>, second: C<V2>, target: C<T>) -> CoreResult<Self> {
        Self::from_parts(raw, (first, second, target))
    }

    /// Every `(first, second, target)` row.
    pub fn as_flat_set(&self) -> SetRef<(V1, V2, T)> {
        let (a, b, t) = &self.columns;
        flat(&self.raw, row3(a, b, t))
    }

    /// Targets grouped by both key columns.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the relation cannot be grouped.
    pub fn as_grouped_map(&self) -> CoreResult<MapRef<(V1, V2), SetRef<T>>> {
        let (a, b, t) = &self.columns;
        grouped(&self.raw, 2, row2(a, b), target_sets(t))
    }

    /// Sub-indexes keyed by the first column.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the relation cannot be grouped.
    pub fn group_by_1(&self) -> CoreResult<MapRef<V1, Index1<V2, T>>> {
        let (a, b, t) = &self.columns;
        let sub = IndexConverter::<Index1<V2, T>>::new((Arc::clone(b), Arc::clone(t)));
        grouped(&self.raw, 1, row1(a), sub)
    }

    /// The index of `(first) -> second`, hiding the target column.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the relation cannot be projected.
    pub fn as_index(&self) -> CoreResult<Index1<V1, V2>> {
        let (a, b, _) = &self.columns;
        Index1::new(self.raw.project()?, Arc::clone(a), Arc::clone(b))
    }

    /// Targets stored under `key`; empty if there are none.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if `key` cannot be converted.
    pub fn targets(&self, key: &(V1, V2)) -> CoreResult<SetRef<T>> {
        let (a, b, t) = &self.columns;
        targets(&self.raw, &row2(a, b), key, t)
    }
}

impl<V1: 'static, V2: 'static, V3: 'static, T: 'static> Index3<V1, V2, V3, T> {
    /// Wraps a four-column relation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if `raw` has a different arity.
    pub fn new(
        raw: RawIndex,
        first: C<V1>,
        second: C<V2>,
        third: C<V3>,
        target: C<T>,
    ) -> CoreResult<Self> {
        Self::from_parts(raw, (first, second, third, target))
    }

    /// Every `(first, second, third, target)` row.
    pub fn as_flat_set(&self) -> SetRef<(V1, V2, V3, T)> {
        let (a, b, c, t) = &self.columns;
        flat(&self.raw, row4(a, b, c, t))
    }

    /// Targets grouped by all three key columns.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the relation cannot be grouped.
    pub fn as_grouped_map(&self) -> CoreResult<MapRef<(V1, V2, V3), SetRef<T>>> {
        let (a, b, c, t) = &self.columns;
        grouped(&self.raw, 3, row3(a, b, c), target_sets(t))
    }

    /// Sub-indexes keyed by the first column.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the relation cannot be grouped.
    pub fn group_by_1(&self) -> CoreResult<MapRef<V1, Index2<V2, V3, T>>> {
        let (a, b, c, t) = &self.columns;
        let sub = IndexConverter::<Index2<V2, V3, T>>::new((
            Arc::clone(b),
            Arc::clone(c),
            Arc::clone(t),
        ));
        grouped(&self.raw, 1, row1(a), sub)
    }

    /// Sub-indexes keyed by the first two columns.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the relation cannot be grouped.
    pub fn group_by_2(&self) -> CoreResult<MapRef<(V1, V2), Index1<V3, T>>> {
        let (a, b, c, t) = &self.columns;
        let sub = IndexConverter::<Index1<V3, T>>::new((Arc::clone(c), Arc::clone(t)));
        grouped(&self.raw, 2, row2(a, b), sub)
    }

    /// The index of `(first, second) -> third`, hiding the target column.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the relation cannot be projected.
    pub fn as_index(&self) -> CoreResult<Index2<V1, V2, V3>> {
        let (a, b, c, _) = &self.columns;
        Index2::new(
            self.raw.project()?,
            Arc::clone(a),
            Arc::clone(b),
            Arc::clone(c),
        )
    }

    /// Targets stored under `key`; empty if there are none.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if `key` cannot be converted.
    pub fn targets(&self, key: &(V1, V2, V3)) -> CoreResult<SetRef<T>> {
        let (a, b, c, t) = &self.columns;
        targets(&self.raw, &row3(a, b, c), key, t)
    }
}

impl<V1: 'static, V2: 'static, V3: 'static, V4: 'static, T: 'static> Index4<V1, V2, V3, V4, T> {
    /// Wraps a five-column relation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if `raw` has a different arity.
    pub fn new(
        raw: RawIndex,
        first: C<V1>,
        second: C<V2>,
        third: C<V3>,
        fourth: C<V4>,
        target: C<T>,
    ) -> CoreResult<Self> {
        Self::from_parts(raw, (first, second, third, fourth, target))
    }

    /// Every `(first, second, third, fourth, target)` row.
    pub fn as_flat_set(&self) -> SetRef<(V1, V2, V3, V4, T)> {
        let (a, b, c, d, t) = &self.columns;
        flat(&self.raw, row5(a, b, c, d, t))
    }

    /// Targets grouped by all four key columns.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the relation cannot be grouped.
    pub fn as_grouped_map(&self) -> CoreResult<MapRef<(V1, V2, V3, V4), SetRef<T>>> {
        let (a, b, c, d, t) = &self.columns;
        grouped(&self.raw, 4, row4(a, b, c, d), target_sets(t))
    }

    /// Sub-indexes keyed by the first column.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the relation cannot be grouped.
    pub fn group_by_1(&self) -> CoreResult<MapRef<V1, Index3<V2, V3, V4, T>>> {
        let (a, b, c, d, t) = &self.columns;
        let sub = IndexConverter::<Index3<V2, V3, V4, T>>::new((
            Arc::clone(b),
            Arc::clone(c),
            Arc::clone(d),
            Arc::clone(t),
        ));
        grouped(&self.raw, 1, row1(a), sub)
    }

    /// Sub-indexes keyed by the first two columns.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the relation cannot be grouped.
    pub fn group_by_2(&self) -> CoreResult<MapRef<(V1, V2), Index2<V3, V4, T>>> {
        let (a, b, c, d, t) = &self.columns;
        let sub = IndexConverter::<Index2<V3, V4, T>>::new((
            Arc::clone(c),
            Arc::clone(d),
            Arc::clone(t),
        ));
        grouped(&self.raw, 2, row2(a, b), sub)
    }

    /// Sub-indexes keyed by the first three columns.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the relation cannot be grouped.
    pub fn group_by_3(&self) -> CoreResult<MapRef<(V1, V2, V3), Index1<V4, T>>> {
        let (a, b, c, d, t) = &self.columns;
        let sub = IndexConverter::<Index1<V4, T>>::new((Arc::clone(d), Arc::clone(t)));
        grouped(&self.raw, 3, row3(a, b, c), sub)
    }

    /// The index of `(first, second, third) -> fourth`, hiding the target
    /// column.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the relation cannot be projected.
    pub fn as_index(&self) -> CoreResult<Index3<V1, V2, V3, V4>> {
        let (a, b, c, d, _) = &self.columns;
        Index3::new(
            self.raw.project()?,
            Arc::clone(a),
            Arc::clone(b),
            Arc::clone(c),
            Arc::clone(d),
        )
    }

    /// Targets stored under `key`; empty if there are none.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if `key` cannot be converted.
    pub fn targets(&self, key: &(V1, V2, V3, V4)) -> CoreResult<SetRef<T>> {
        let (a, b, c, d, t) = &self.columns;
        targets(&self.raw, &row4(a, b, c, d), key, t)
    }
}
