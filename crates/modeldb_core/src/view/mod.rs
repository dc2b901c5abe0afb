//! Ordered collection views.
//!
//! Views read through to their backing store on every call and never
//! cache. Write methods default to failing with `ReadOnlyView`; views
//! over entity fields override them to write through.

mod converted;

pub use converted::{ConvertedList, ConvertedMap, ConvertedSet};

use crate::error::{CoreError, CoreResult};
use std::sync::Arc;

/// A boxed iterator over view items.
///
/// A failure to read the backing store surfaces as an `Err` item.
pub type ViewIter<'a, T> = Box<dyn Iterator<Item = CoreResult<T>> + 'a>;

/// A shared, type-erased set view.
pub type SetRef<T> = Arc<dyn SetView<T>>;

/// A shared, type-erased map view.
pub type MapRef<K, V> = Arc<dyn MapView<K, V>>;

/// A shared, type-erased list view.
pub type ListRef<T> = Arc<dyn ListView<T>>;

/// An ordered set.
pub trait SetView<T>: Send + Sync {
    /// Iterates the elements in storage order.
    fn iter(&self) -> ViewIter<'_, T>;

    /// Checks membership. Values the view cannot represent are absent.
    fn contains(&self, value: &T) -> CoreResult<bool>;

    /// Adds an element, returning whether it was new.
    fn insert(&self, _value: T) -> CoreResult<bool> {
        Err(CoreError::ReadOnlyView)
    }

    /// Removes an element, returning whether it was present.
    fn remove(&self, _value: &T) -> CoreResult<bool> {
        Err(CoreError::ReadOnlyView)
    }

    /// Counts the elements.
    fn len(&self) -> CoreResult<usize> {
        self.iter().try_fold(0, |n, item| item.map(|_| n + 1))
    }

    /// Returns true if the set has no elements.
    fn is_empty(&self) -> CoreResult<bool> {
        Ok(self.first()?.is_none())
    }

    /// Returns the smallest element.
    fn first(&self) -> CoreResult<Option<T>> {
        self.iter().next().transpose()
    }

    /// Collects the elements.
    fn to_vec(&self) -> CoreResult<Vec<T>> {
        self.iter().collect()
    }
}

/// An ordered map.
pub trait MapView<K, V>: Send + Sync {
    /// Iterates the entries in key order.
    fn iter(&self) -> ViewIter<'_, (K, V)>;

    /// Looks up a key. Keys the view cannot represent are absent.
    fn get(&self, key: &K) -> CoreResult<Option<V>>;

    /// Checks whether a key is present.
    fn contains_key(&self, key: &K) -> CoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Stores a value, returning the previous one.
    fn put(&self, _key: K, _value: V) -> CoreResult<Option<V>> {
        Err(CoreError::ReadOnlyView)
    }

    /// Removes a key, returning its value.
    fn remove(&self, _key: &K) -> CoreResult<Option<V>> {
        Err(CoreError::ReadOnlyView)
    }

    /// Iterates the keys in order.
    fn keys<'a>(&'a self) -> ViewIter<'a, K>
    where
        K: 'a,
        V: 'a,
    {
        Box::new(self.iter().map(|entry| entry.map(|(k, _)| k)))
    }

    /// Counts the entries.
    fn len(&self) -> CoreResult<usize> {
        self.iter().try_fold(0, |n, item| item.map(|_| n + 1))
    }

    /// Returns true if the map has no entries.
    fn is_empty(&self) -> CoreResult<bool> {
        Ok(self.iter().next().transpose()?.is_none())
    }

    /// Collects the entries.
    fn to_vec(&self) -> CoreResult<Vec<(K, V)>> {
        self.iter().collect()
    }
}

/// A positional list.
pub trait ListView<T>: Send + Sync {
    /// Iterates the elements in position order.
    fn iter(&self) -> ViewIter<'_, T>;

    /// Returns the element at `index`.
    fn get(&self, index: usize) -> CoreResult<Option<T>>;

    /// Appends an element.
    fn push(&self, _value: T) -> CoreResult<()> {
        Err(CoreError::ReadOnlyView)
    }

    /// Replaces the element at `index`, returning the old one.
    fn set(&self, _index: usize, _value: T) -> CoreResult<T> {
        Err(CoreError::ReadOnlyView)
    }

    /// Counts the elements.
    fn len(&self) -> CoreResult<usize> {
        self.iter().try_fold(0, |n, item| item.map(|_| n + 1))
    }

    /// Collects the elements.
    fn to_vec(&self) -> CoreResult<Vec<T>> {
        self.iter().collect()
    }
}

impl<T, S: SetView<T> + ?Sized> SetView<T> for Arc<S> {
    fn iter(&self) -> ViewIter<'_, T> {
        (**self).iter()
    }

    fn contains(&self, value: &T) -> CoreResult<bool> {
        (**self).contains(value)
    }

    fn insert(&self, value: T) -> CoreResult<bool> {
        (**self).insert(value)
    }

    fn remove(&self, value: &T) -> CoreResult<bool> {
        (**self).remove(value)
    }

    fn len(&self) -> CoreResult<usize> {
        (**self).len()
    }
}

impl<K, V, M: MapView<K, V> + ?Sized> MapView<K, V> for Arc<M> {
    fn iter(&self) -> ViewIter<'_, (K, V)> {
        (**self).iter()
    }

    fn get(&self, key: &K) -> CoreResult<Option<V>> {
        (**self).get(key)
    }

    fn put(&self, key: K, value: V) -> CoreResult<Option<V>> {
        (**self).put(key, value)
    }

    fn remove(&self, key: &K) -> CoreResult<Option<V>> {
        (**self).remove(key)
    }

    fn len(&self) -> CoreResult<usize> {
        (**self).len()
    }
}

impl<T, L: ListView<T> + ?Sized> ListView<T> for Arc<L> {
    fn iter(&self) -> ViewIter<'_, T> {
        (**self).iter()
    }

    fn get(&self, index: usize) -> CoreResult<Option<T>> {
        (**self).get(index)
    }

    fn push(&self, value: T) -> CoreResult<()> {
        (**self).push(value)
    }

    fn set(&self, index: usize, value: T) -> CoreResult<T> {
        (**self).set(index, value)
    }

    fn len(&self) -> CoreResult<usize> {
        (**self).len()
    }
}
