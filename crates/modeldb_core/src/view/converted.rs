//! Views re-typed through converters.

use super::{ListRef, ListView, MapRef, MapView, SetRef, SetView, ViewIter};
use crate::convert::Converter;
use crate::error::{CoreError, CoreResult};
use std::marker::PhantomData;

/// Treats values outside a converter's domain as absent.
fn absent_if_invalid<T>(result: CoreResult<T>) -> CoreResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(CoreError::InvalidValue { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

/// A set of `T` backed by a set of `S`.
///
/// Reads run the converter backward, writes run it forward. Because the
/// converter preserves order, iteration order carries over unchanged.
pub struct ConvertedSet<S, T, C> {
    inner: SetRef<S>,
    converter: C,
    _elem: PhantomData<fn() -> T>,
}

impl<S, T, C: Converter<T, S>> ConvertedSet<S, T, C> {
    /// Wraps `inner` so its elements appear as `T`.
    pub fn new(inner: SetRef<S>, converter: C) -> Self {
        Self {
            inner,
            converter,
            _elem: PhantomData,
        }
    }

    /// The backing set.
    pub fn inner(&self) -> &SetRef<S> {
        &self.inner
    }
}

impl<S: 'static, T: 'static, C: Converter<T, S>> SetView<T> for ConvertedSet<S, T, C> {
    fn iter(&self) -> ViewIter<'_, T> {
        Box::new(
            self.inner
                .iter()
                .map(move |item| item.and_then(|stored| self.converter.backward(&stored))),
        )
    }

    fn contains(&self, value: &T) -> CoreResult<bool> {
        match absent_if_invalid(self.converter.forward(value))? {
            Some(stored) => self.inner.contains(&stored),
            None => Ok(false),
        }
    }

    fn insert(&self, value: T) -> CoreResult<bool> {
        self.inner.insert(self.converter.forward(&value)?)
    }

    fn remove(&self, value: &T) -> CoreResult<bool> {
        match absent_if_invalid(self.converter.forward(value))? {
            Some(stored) => self.inner.remove(&stored),
            None => Ok(false),
        }
    }

    fn len(&self) -> CoreResult<usize> {
        self.inner.len()
    }
}

/// A map of `K2 -> V2` backed by a map of `K1 -> V1`.
pub struct ConvertedMap<K1, V1, K2, V2, KC, VC> {
    inner: MapRef<K1, V1>,
    keys: KC,
    values: VC,
    _entry: PhantomData<fn() -> (K2, V2)>,
}

impl<K1, V1, K2, V2, KC, VC> ConvertedMap<K1, V1, K2, V2, KC, VC>
where
    KC: Converter<K2, K1>,
    VC: Converter<V2, V1>,
{
    /// Wraps `inner`, converting keys and values independently.
    pub fn new(inner: MapRef<K1, V1>, keys: KC, values: VC) -> Self {
        Self {
            inner,
            keys,
            values,
            _entry: PhantomData,
        }
    }
}

impl<K1, V1, K2, V2, KC, VC> MapView<K2, V2> for ConvertedMap<K1, V1, K2, V2, KC, VC>
where
    K1: 'static,
    V1: 'static,
    K2: 'static,
    V2: 'static,
    KC: Converter<K2, K1>,
    VC: Converter<V2, V1>,
{
    fn iter(&self) -> ViewIter<'_, (K2, V2)> {
        Box::new(self.inner.iter().map(move |item| -> CoreResult<(K2, V2)> {
            let (k, v) = item?;
            Ok((self.keys.backward(&k)?, self.values.backward(&v)?))
        }))
    }

    fn get(&self, key: &K2) -> CoreResult<Option<V2>> {
        let Some(stored) = absent_if_invalid(self.keys.forward(key))? else {
            return Ok(None);
        };
        self.inner
            .get(&stored)?
            .map(|v| self.values.backward(&v))
            .transpose()
    }

    fn put(&self, key: K2, value: V2) -> CoreResult<Option<V2>> {
        let previous = self
            .inner
            .put(self.keys.forward(&key)?, self.values.forward(&value)?)?;
        previous.map(|v| self.values.backward(&v)).transpose()
    }

    fn remove(&self, key: &K2) -> CoreResult<Option<V2>> {
        let Some(stored) = absent_if_invalid(self.keys.forward(key))? else {
            return Ok(None);
        };
        self.inner
            .remove(&stored)?
            .map(|v| self.values.backward(&v))
            .transpose()
    }

    fn len(&self) -> CoreResult<usize> {
        self.inner.len()
    }
}

/// A list of `T` backed by a list of `S`.
pub struct ConvertedList<S, T, C> {
    inner: ListRef<S>,
    converter: C,
    _elem: PhantomData<fn() -> T>,
}

impl<S, T, C: Converter<T, S>> ConvertedList<S, T, C> {
    /// Wraps `inner` so its elements appear as `T`.
    pub fn new(inner: ListRef<S>, converter: C) -> Self {
        Self {
            inner,
            converter,
            _elem: PhantomData,
        }
    }
}

impl<S: 'static, T: 'static, C: Converter<T, S>> ListView<T> for ConvertedList<S, T, C> {
    fn iter(&self) -> ViewIter<'_, T> {
        Box::new(
            self.inner
                .iter()
                .map(move |item| item.and_then(|stored| self.converter.backward(&stored))),
        )
    }

    fn get(&self, index: usize) -> CoreResult<Option<T>> {
        self.inner
            .get(index)?
            .map(|stored| self.converter.backward(&stored))
            .transpose()
    }

    fn push(&self, value: T) -> CoreResult<()> {
        self.inner.push(self.converter.forward(&value)?)
    }

    fn set(&self, index: usize, value: T) -> CoreResult<T> {
        let old = self.inner.set(index, self.converter.forward(&value)?)?;
        self.converter.backward(&old)
    }

    fn len(&self) -> CoreResult<usize> {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ValueConverter;
    use modeldb_codec::Value;
    use parking_lot::Mutex;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Arc;

    #[derive(Default)]
    struct MemSet(Mutex<BTreeSet<Value>>);

    impl SetView<Value> for MemSet {
        fn iter(&self) -> ViewIter<'_, Value> {
            let items: Vec<_> = self.0.lock().iter().cloned().collect();
            Box::new(items.into_iter().map(Ok))
        }

        fn contains(&self, value: &Value) -> CoreResult<bool> {
            Ok(self.0.lock().contains(value))
        }

        fn insert(&self, value: Value) -> CoreResult<bool> {
            Ok(self.0.lock().insert(value))
        }

        fn remove(&self, value: &Value) -> CoreResult<bool> {
            Ok(self.0.lock().remove(value))
        }
    }

    #[derive(Default)]
    struct MemMap(Mutex<BTreeMap<Value, Value>>);

    impl MapView<Value, Value> for MemMap {
        fn iter(&self) -> ViewIter<'_, (Value, Value)> {
            let items: Vec<_> = self
                .0
                .lock()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            Box::new(items.into_iter().map(Ok))
        }

        fn get(&self, key: &Value) -> CoreResult<Option<Value>> {
            Ok(self.0.lock().get(key).cloned())
        }

        fn put(&self, key: Value, value: Value) -> CoreResult<Option<Value>> {
            Ok(self.0.lock().insert(key, value))
        }
    }

    #[test]
    fn set_reads_and_writes_through() {
        let inner: SetRef<Value> = Arc::new(MemSet::default());
        let ints = ConvertedSet::new(Arc::clone(&inner), ValueConverter::<i64>::new());

        assert!(ints.insert(3).unwrap());
        assert!(ints.insert(-1).unwrap());
        assert!(!ints.insert(3).unwrap());
        assert_eq!(ints.to_vec().unwrap(), vec![-1, 3]);
        assert!(inner.contains(&Value::Integer(3)).unwrap());
        assert!(ints.remove(&-1).unwrap());
        assert_eq!(ints.len().unwrap(), 1);
    }

    #[test]
    fn set_surfaces_foreign_elements_as_errors() {
        let inner: SetRef<Value> = Arc::new(MemSet::default());
        inner.insert(Value::text("x")).unwrap();
        let ints = ConvertedSet::new(inner, ValueConverter::<i64>::new());
        assert!(ints.iter().next().unwrap().is_err());
    }

    #[test]
    fn map_converts_keys_and_values() {
        let inner: MapRef<Value, Value> = Arc::new(MemMap::default());
        let map = ConvertedMap::new(
            inner,
            ValueConverter::<String>::new(),
            ValueConverter::<i64>::new(),
        );
        assert_eq!(map.put("a".to_string(), 1).unwrap(), None);
        assert_eq!(map.put("a".to_string(), 2).unwrap(), Some(1));
        assert_eq!(map.get(&"a".to_string()).unwrap(), Some(2));
        assert_eq!(map.get(&"b".to_string()).unwrap(), None);
        assert!(matches!(
            map.remove(&"a".to_string()),
            Err(CoreError::ReadOnlyView)
        ));
    }
}
