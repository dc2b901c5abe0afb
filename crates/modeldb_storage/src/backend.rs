//! Ordered store trait definition.

use crate::error::StorageResult;
use std::ops::Bound;

/// A byte-ordered key/value store.
///
/// Stores are **opaque ordered byte maps**. ModelDB owns all key layout and
/// value interpretation; a store only guarantees ordering.
///
/// # Invariants
///
/// - Keys compare byte-lexicographically
/// - `scan_prefix` returns every entry whose key starts with the prefix,
///   in ascending key order
/// - `scan_keys` returns a page of those keys; a page shorter than the
///   limit is the last one
/// - A `put` is visible to every later `get` and `scan_prefix` on the same
///   store
/// - Stores must be `Send + Sync`; all methods take `&self` and synchronize
///   internally
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::OverlayStore`] - Write buffer used by transactions
pub trait OrderedStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unusable.
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty or the store is unusable.
    fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Removes `key`, returning whether it was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unusable.
    fn remove(&self, key: &[u8]) -> StorageResult<bool>;

    /// Returns all entries whose key starts with `prefix`, in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unusable.
    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Returns up to `limit` keys starting with `prefix`, beginning at
    /// `from`, in key order.
    ///
    /// `Bound::Unbounded` starts at the prefix itself. To page through a
    /// prefix, pass the last key of the previous page as `Bound::Excluded`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unusable.
    fn scan_keys(
        &self,
        prefix: &[u8],
        from: Bound<&[u8]>,
        limit: usize,
    ) -> StorageResult<Vec<Vec<u8>>> {
        Ok(self
            .scan_prefix(prefix)?
            .into_iter()
            .map(|(key, _)| key)
            .filter(|key| starts_at(key, from))
            .take(limit)
            .collect())
    }

    /// Checks whether `key` is present.
    fn contains(&self, key: &[u8]) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Checks whether any key starts with `prefix`.
    fn has_prefix(&self, prefix: &[u8]) -> StorageResult<bool> {
        Ok(!self.scan_prefix(prefix)?.is_empty())
    }

    /// Removes every entry whose key starts with `prefix`.
    ///
    /// Returns the number of removed entries.
    fn remove_prefix(&self, prefix: &[u8]) -> StorageResult<usize> {
        let mut removed = 0;
        for (key, _) in self.scan_prefix(prefix)? {
            if self.remove(&key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Checks whether `key` lies at or after `from`.
pub(crate) fn starts_at(key: &[u8], from: Bound<&[u8]>) -> bool {
    match from {
        Bound::Included(start) => key >= start,
        Bound::Excluded(start) => key > start,
        Bound::Unbounded => true,
    }
}
