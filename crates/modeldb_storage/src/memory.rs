//! In-memory ordered store for testing.

use crate::backend::OrderedStore;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-memory ordered store.
///
/// This store keeps all entries in a `BTreeMap` and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral databases that don't need persistence
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use modeldb_storage::{InMemoryStore, OrderedStore};
///
/// let store = InMemoryStore::new();
/// store.put(b"k", b"v").unwrap();
/// assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    closed: AtomicBool,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory store with pre-existing entries.
    #[must_use]
    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
    {
        Self {
            entries: RwLock::new(entries.into_iter().collect()),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns a copy of all entries in key order.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn entries(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Closes the store. Every later operation fails with
    /// [`StorageError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }
}

/// Iterates the entries of `map` whose key starts with `prefix`.
pub(crate) fn prefix_range<'a, V>(
    map: &'a BTreeMap<Vec<u8>, V>,
    prefix: &'a [u8],
) -> impl Iterator<Item = (&'a Vec<u8>, &'a V)> + 'a {
    key_range(map, prefix, Bound::Unbounded)
}

/// Iterates the entries of `map` whose key starts with `prefix`, beginning
/// at `from`.
pub(crate) fn key_range<'a, V>(
    map: &'a BTreeMap<Vec<u8>, V>,
    prefix: &'a [u8],
    from: Bound<&'a [u8]>,
) -> impl Iterator<Item = (&'a Vec<u8>, &'a V)> + 'a {
    let start = match from {
        Bound::Included(key) if key > prefix => Bound::Included(key),
        Bound::Excluded(key) if key >= prefix => Bound::Excluded(key),
        _ => Bound::Included(prefix),
    };
    map.range::<[u8], _>((start, Bound::Unbounded))
        .take_while(move |(key, _)| key.starts_with(prefix))
}

impl OrderedStore for InMemoryStore {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.ensure_open()?;
        if key.is_empty() {
            return Err(StorageError::EmptyKey);
        }
        self.entries.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &[u8]) -> StorageResult<bool> {
        self.ensure_open()?;
        Ok(self.entries.write().remove(key).is_some())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.ensure_open()?;
        let entries = self.entries.read();
        Ok(prefix_range(&entries, prefix)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn scan_keys(
        &self,
        prefix: &[u8],
        from: Bound<&[u8]>,
        limit: usize,
    ) -> StorageResult<Vec<Vec<u8>>> {
        self.ensure_open()?;
        let entries = self.entries.read();
        Ok(key_range(&entries, prefix, from)
            .take(limit)
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn has_prefix(&self, prefix: &[u8]) -> StorageResult<bool> {
        self.ensure_open()?;
        let entries = self.entries.read();
        let found = prefix_range(&entries, prefix).next().is_some();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());
        assert!(store.entries().is_empty());
    }

    #[test]
    fn memory_put_and_get() {
        let store = InMemoryStore::new();
        store.put(b"a", b"1").unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"b").unwrap(), None);
    }

    #[test]
    fn memory_put_overwrites() {
        let store = InMemoryStore::new();
        store.put(b"a", b"1").unwrap();
        store.put(b"a", b"2").unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_empty_key_rejected() {
        let store = InMemoryStore::new();
        assert_eq!(store.put(b"", b"x"), Err(StorageError::EmptyKey));
    }

    #[test]
    fn memory_remove() {
        let store = InMemoryStore::new();
        store.put(b"a", b"1").unwrap();
        assert!(store.remove(b"a").unwrap());
        assert!(!store.remove(b"a").unwrap());
        assert!(!store.contains(b"a").unwrap());
    }

    #[test]
    fn memory_scan_prefix_is_ordered_and_bounded() {
        let store = InMemoryStore::new();
        store.put(b"ab\x02", b"2").unwrap();
        store.put(b"ab\x01", b"1").unwrap();
        store.put(b"ac", b"x").unwrap();
        store.put(b"aa", b"y").unwrap();

        let found = store.scan_prefix(b"ab").unwrap();
        assert_eq!(
            found,
            vec![
                (b"ab\x01".to_vec(), b"1".to_vec()),
                (b"ab\x02".to_vec(), b"2".to_vec())
            ]
        );
        assert!(store.has_prefix(b"a").unwrap());
        assert!(!store.has_prefix(b"b").unwrap());
    }

    #[test]
    fn memory_remove_prefix() {
        let store = InMemoryStore::new();
        store.put(b"x1", b"").unwrap();
        store.put(b"x2", b"").unwrap();
        store.put(b"y1", b"").unwrap();

        assert_eq!(store.remove_prefix(b"x").unwrap(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_closed_store_fails() {
        let store = InMemoryStore::with_entries(vec![(b"k".to_vec(), b"v".to_vec())]);
        store.close();
        assert_eq!(store.get(b"k"), Err(StorageError::Closed));
        assert_eq!(store.put(b"k", b"v"), Err(StorageError::Closed));
        assert_eq!(store.scan_prefix(b""), Err(StorageError::Closed));
    }

    #[test]
    fn memory_scan_keys_pages_from_a_bound() {
        let store = InMemoryStore::new();
        let keys: [&[u8]; 5] = [b"a", b"p1", b"p2", b"p3", b"q"];
        for key in keys {
            store.put(key, b"").unwrap();
        }

        let first = store.scan_keys(b"p", Bound::Unbounded, 2).unwrap();
        assert_eq!(first, vec![b"p1".to_vec(), b"p2".to_vec()]);
        let rest = store
            .scan_keys(b"p", Bound::Excluded(b"p2".as_slice()), 2)
            .unwrap();
        assert_eq!(rest, vec![b"p3".to_vec()]);
        let skipped = store
            .scan_keys(b"p", Bound::Included(b"p3".as_slice()), 2)
            .unwrap();
        assert_eq!(skipped, vec![b"p3".to_vec()]);
        assert!(store
            .scan_keys(b"p", Bound::Included(b"a".as_slice()), 0)
            .unwrap()
            .is_empty());
    }

    proptest! {
        #[test]
        fn scan_prefix_matches_filter(
            keys in prop::collection::btree_set(prop::collection::vec(0u8..4, 1..5), 0..40),
            prefix in prop::collection::vec(0u8..4, 0..3),
        ) {
            let store = InMemoryStore::new();
            for key in &keys {
                store.put(key, b"").unwrap();
            }
            let scanned: Vec<Vec<u8>> = store
                .scan_prefix(&prefix)
                .unwrap()
                .into_iter()
                .map(|(k, _)| k)
                .collect();
            let expected: Vec<Vec<u8>> = keys
                .iter()
                .filter(|k| k.starts_with(&prefix))
                .cloned()
                .collect();
            prop_assert_eq!(scanned, expected);
        }
    }
}
