//! Lifting element converters to whole collection views.

use super::{Converter, Reversed};
use crate::error::CoreResult;
use crate::view::{ConvertedList, ConvertedMap, ConvertedSet, ListRef, MapRef, SetRef};
use std::sync::Arc;

/// Converts set views element-wise.
///
/// The resulting views are lazy wrappers: they read and write through to
/// the original set on every call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SetViewConverter<C>(pub C);

impl<A, B, C> Converter<SetRef<A>, SetRef<B>> for SetViewConverter<C>
where
    A: 'static,
    B: 'static,
    C: Converter<A, B> + Clone + 'static,
{
    fn forward(&self, value: &SetRef<A>) -> CoreResult<SetRef<B>> {
        Ok(Arc::new(ConvertedSet::<A, B, _>::new(
            Arc::clone(value),
            Reversed(self.0.clone()),
        )))
    }

    fn backward(&self, value: &SetRef<B>) -> CoreResult<SetRef<A>> {
        Ok(Arc::new(ConvertedSet::<B, A, _>::new(
            Arc::clone(value),
            self.0.clone(),
        )))
    }
}

/// Converts map views, applying the key and value converters
/// independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MapViewConverter<KC, VC>(pub KC, pub VC);

impl<K1, V1, K2, V2, KC, VC> Converter<MapRef<K1, V1>, MapRef<K2, V2>> for MapViewConverter<KC, VC>
where
    K1: 'static,
    V1: 'static,
    K2: 'static,
    V2: 'static,
    KC: Converter<K1, K2> + Clone + 'static,
    VC: Converter<V1, V2> + Clone + 'static,
{
    fn forward(&self, value: &MapRef<K1, V1>) -> CoreResult<MapRef<K2, V2>> {
        Ok(Arc::new(ConvertedMap::<K1, V1, K2, V2, _, _>::new(
            Arc::clone(value),
            Reversed(self.0.clone()),
            Reversed(self.1.clone()),
        )))
    }

    fn backward(&self, value: &MapRef<K2, V2>) -> CoreResult<MapRef<K1, V1>> {
        Ok(Arc::new(ConvertedMap::<K2, V2, K1, V1, _, _>::new(
            Arc::clone(value),
            self.0.clone(),
            self.1.clone(),
        )))
    }
}

/// Converts list views element-wise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ListViewConverter<C>(pub C);

impl<A, B, C> Converter<ListRef<A>, ListRef<B>> for ListViewConverter<C>
where
    A: 'static,
    B: 'static,
    C: Converter<A, B> + Clone + 'static,
{
    fn forward(&self, value: &ListRef<A>) -> CoreResult<ListRef<B>> {
        Ok(Arc::new(ConvertedList::<A, B, _>::new(
            Arc::clone(value),
            Reversed(self.0.clone()),
        )))
    }

    fn backward(&self, value: &ListRef<B>) -> CoreResult<ListRef<A>> {
        Ok(Arc::new(ConvertedList::<B, A, _>::new(
            Arc::clone(value),
            self.0.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ValueConverter;
    use crate::view::{ListView, MapView, SetView, ViewIter};
    use modeldb_codec::Value;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;

    struct Fixed(Vec<Value>);

    impl SetView<Value> for Fixed {
        fn iter(&self) -> ViewIter<'_, Value> {
            Box::new(self.0.iter().cloned().map(Ok))
        }

        fn contains(&self, value: &Value) -> CoreResult<bool> {
            Ok(self.0.contains(value))
        }
    }

    #[test]
    fn lifted_views_round_trip() {
        let stored: SetRef<Value> = Arc::new(Fixed(vec![Value::Integer(1), Value::Integer(4)]));
        let conv = SetViewConverter(ValueConverter::<i64>::new().reverse());

        let native: SetRef<i64> = conv.forward(&stored).unwrap();
        assert_eq!(native.to_vec().unwrap(), vec![1, 4]);
        assert!(native.contains(&4).unwrap());

        let back: SetRef<Value> = conv.backward(&native).unwrap();
        assert_eq!(back.to_vec().unwrap(), vec![Value::Integer(1), Value::Integer(4)]);
        assert!(!back.contains(&Value::text("4")).unwrap());
    }

    #[test]
    fn lifted_view_is_read_only_when_inner_is() {
        let stored: SetRef<Value> = Arc::new(Fixed(vec![]));
        let conv = SetViewConverter(ValueConverter::<i64>::new().reverse());
        let native = conv.forward(&stored).unwrap();
        assert!(native.insert(1).is_err());
    }

    #[derive(Default)]
    struct Stored(Mutex<BTreeMap<Value, Value>>);

    impl MapView<Value, Value> for Stored {
        fn iter(&self) -> ViewIter<'_, (Value, Value)> {
            let entries: Vec<_> = self.0.lock().clone().into_iter().collect();
            Box::new(entries.into_iter().map(Ok))
        }

        fn get(&self, key: &Value) -> CoreResult<Option<Value>> {
            Ok(self.0.lock().get(key).cloned())
        }

        fn put(&self, key: Value, value: Value) -> CoreResult<Option<Value>> {
            Ok(self.0.lock().insert(key, value))
        }

        fn remove(&self, key: &Value) -> CoreResult<Option<Value>> {
            Ok(self.0.lock().remove(key))
        }
    }

    #[derive(Default)]
    struct Log(Mutex<Vec<Value>>);

    impl ListView<Value> for Log {
        fn iter(&self) -> ViewIter<'_, Value> {
            let items = self.0.lock().clone();
            Box::new(items.into_iter().map(Ok))
        }

        fn get(&self, index: usize) -> CoreResult<Option<Value>> {
            Ok(self.0.lock().get(index).cloned())
        }

        fn push(&self, value: Value) -> CoreResult<()> {
            self.0.lock().push(value);
            Ok(())
        }
    }

    #[test]
    fn lifted_maps_convert_keys_and_values_independently() {
        let stored = Arc::new(Stored::default());
        let raw: MapRef<Value, Value> = stored.clone();
        let conv = MapViewConverter(
            ValueConverter::<String>::new().reverse(),
            ValueConverter::<i64>::new().reverse(),
        );

        let native: MapRef<String, i64> = conv.forward(&raw).unwrap();
        assert_eq!(native.put("b".to_string(), 2).unwrap(), None);
        native.put("a".to_string(), 1).unwrap();
        assert_eq!(
            stored.get(&Value::text("b")).unwrap(),
            Some(Value::Integer(2))
        );
        assert_eq!(
            native.to_vec().unwrap(),
            vec![("a".to_string(), 1), ("b".to_string(), 2)]
        );

        let back: MapRef<Value, Value> = conv.backward(&native).unwrap();
        assert_eq!(back.get(&Value::text("a")).unwrap(), Some(Value::Integer(1)));
        assert_eq!(back.get(&Value::Integer(1)).unwrap(), None);
        assert!(back.put(Value::text("c"), Value::text("x")).is_err());
        assert!(!stored.contains_key(&Value::text("c")).unwrap());
    }

    #[test]
    fn lifted_lists_write_through() {
        let stored = Arc::new(Log::default());
        let raw: ListRef<Value> = stored.clone();
        let conv = ListViewConverter(ValueConverter::<bool>::new().reverse());

        let native: ListRef<bool> = conv.forward(&raw).unwrap();
        native.push(true).unwrap();
        native.push(false).unwrap();
        assert_eq!(stored.to_vec().unwrap(), vec![Value::Bool(true), Value::Bool(false)]);
        assert_eq!(native.get(1).unwrap(), Some(false));

        let back: ListRef<Value> = conv.backward(&native).unwrap();
        assert_eq!(back.to_vec().unwrap(), vec![Value::Bool(true), Value::Bool(false)]);
        assert!(back.push(Value::Integer(1)).is_err());
        assert_eq!(stored.len().unwrap(), 2);
    }
}
