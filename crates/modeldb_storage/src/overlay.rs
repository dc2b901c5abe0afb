//! Transaction-local write buffer.

use crate::backend::OrderedStore;
use crate::error::{StorageError, StorageResult};
use crate::memory::{key_range, prefix_range};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

/// Represents a pending write buffered by an [`OverlayStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingWrite {
    /// Insert or replace the value.
    Put(Vec<u8>),
    /// Remove the key.
    Remove,
}

/// A write buffer layered over a base store.
///
/// Reads see the buffered writes first and fall back to the base store,
/// so the owner always reads its own writes. Nothing reaches the base
/// store until [`OverlayStore::apply`] is called.
///
/// ```rust
/// use modeldb_storage::{InMemoryStore, OrderedStore, OverlayStore};
/// use std::sync::Arc;
///
/// let base = Arc::new(InMemoryStore::new());
/// let overlay = OverlayStore::new(base.clone());
/// overlay.put(b"k", b"v").unwrap();
/// assert!(base.get(b"k").unwrap().is_none());
///
/// overlay.apply().unwrap();
/// assert_eq!(base.get(b"k").unwrap(), Some(b"v".to_vec()));
/// ```
pub struct OverlayStore {
    base: Arc<dyn OrderedStore>,
    writes: RwLock<BTreeMap<Vec<u8>, PendingWrite>>,
}

impl OverlayStore {
    /// Creates an empty overlay over `base`.
    pub fn new(base: Arc<dyn OrderedStore>) -> Self {
        Self {
            base,
            writes: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the base store.
    pub fn base(&self) -> &Arc<dyn OrderedStore> {
        &self.base
    }

    /// Returns a copy of all buffered writes in key order.
    pub fn pending(&self) -> Vec<(Vec<u8>, PendingWrite)> {
        self.writes
            .read()
            .iter()
            .map(|(k, w)| (k.clone(), w.clone()))
            .collect()
    }

    /// Returns the number of buffered writes.
    pub fn write_count(&self) -> usize {
        self.writes.read().len()
    }

    /// Writes every buffered change to the base store and clears the buffer.
    ///
    /// Returns the number of applied writes.
    pub fn apply(&self) -> StorageResult<usize> {
        let mut writes = self.writes.write();
        let count = writes.len();
        for (key, write) in writes.iter() {
            match write {
                PendingWrite::Put(value) => self.base.put(key, value)?,
                PendingWrite::Remove => {
                    self.base.remove(key)?;
                }
            }
        }
        writes.clear();
        Ok(count)
    }

    /// Drops every buffered change.
    pub fn discard(&self) {
        self.writes.write().clear();
    }
}

impl OrderedStore for OverlayStore {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        match self.writes.read().get(key) {
            Some(PendingWrite::Put(value)) => return Ok(Some(value.clone())),
            Some(PendingWrite::Remove) => return Ok(None),
            None => {}
        }
        self.base.get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::EmptyKey);
        }
        self.writes
            .write()
            .insert(key.to_vec(), PendingWrite::Put(value.to_vec()));
        Ok(())
    }

    fn remove(&self, key: &[u8]) -> StorageResult<bool> {
        let existed = self.get(key)?.is_some();
        self.writes.write().insert(key.to_vec(), PendingWrite::Remove);
        Ok(existed)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let base = self.base.scan_prefix(prefix)?;
        let writes = self.writes.read();
        Ok(merge(
            base,
            |(key, _)| key,
            prefix_range(&writes, prefix),
            |key, value| (key.clone(), value.clone()),
        ))
    }

    fn scan_keys(
        &self,
        prefix: &[u8],
        from: Bound<&[u8]>,
        limit: usize,
    ) -> StorageResult<Vec<Vec<u8>>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut resume: Option<Vec<u8>> = None;
        loop {
            let start = match &resume {
                Some(key) => Bound::Excluded(key.as_slice()),
                None => from,
            };
            let base = self.base.scan_keys(prefix, start, limit)?;
            // A full base page only covers keys up to its last one.
            let end = if base.len() == limit { base.last().cloned() } else { None };
            let writes = self.writes.read();
            let local = key_range(&writes, prefix, start)
                .take_while(|(key, _)| end.as_ref().map_or(true, |end| *key <= end));
            let mut page = merge(base, |key| key, local, |key, _| key.clone());
            page.truncate(limit);
            match end {
                // Every base key of this page was removed locally.
                Some(end) if page.is_empty() => resume = Some(end),
                _ => return Ok(page),
            }
        }
    }
}

/// Merges sorted base items with buffered writes over the same key range.
///
/// Buffered writes shadow base entries; removes drop them.
fn merge<'w, T>(
    base: Vec<T>,
    key_of: impl Fn(&T) -> &Vec<u8>,
    local: impl Iterator<Item = (&'w Vec<u8>, &'w PendingWrite)>,
    put: impl Fn(&'w Vec<u8>, &'w Vec<u8>) -> T,
) -> Vec<T> {
    let mut local = local.peekable();
    let mut base = base.into_iter().peekable();
    let mut merged = Vec::new();
    loop {
        let order = match (base.peek(), local.peek()) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(item), Some((key, _))) => key_of(item).cmp(key),
        };
        match order {
            Ordering::Less => merged.extend(base.next()),
            Ordering::Equal | Ordering::Greater => {
                if order == Ordering::Equal {
                    base.next();
                }
                if let Some((key, PendingWrite::Put(value))) = local.next() {
                    merged.push(put(key, value));
                }
            }
        }
    }
    merged
}

impl fmt::Debug for OverlayStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayStore")
            .field("write_count", &self.write_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;

    fn base_with(keys: &[&[u8]]) -> Arc<InMemoryStore> {
        let base = Arc::new(InMemoryStore::new());
        for key in keys {
            base.put(key, b"base").unwrap();
        }
        base
    }

    #[test]
    fn reads_own_writes() {
        let base = base_with(&[b"a"]);
        let overlay = OverlayStore::new(base.clone());

        overlay.put(b"a", b"mine").unwrap();
        assert_eq!(overlay.get(b"a").unwrap(), Some(b"mine".to_vec()));
        assert_eq!(base.get(b"a").unwrap(), Some(b"base".to_vec()));
    }

    #[test]
    fn remove_hides_base_entry() {
        let base = base_with(&[b"a", b"b"]);
        let overlay = OverlayStore::new(base);

        assert!(overlay.remove(b"a").unwrap());
        assert!(overlay.get(b"a").unwrap().is_none());
        let keys: Vec<_> = overlay
            .scan_prefix(b"")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![b"b".to_vec()]);
    }

    #[test]
    fn scan_merges_in_key_order() {
        let base = base_with(&[b"p1", b"p3", b"p5"]);
        let overlay = OverlayStore::new(base);
        overlay.put(b"p2", b"new").unwrap();
        overlay.put(b"p3", b"changed").unwrap();
        overlay.remove(b"p5").unwrap();
        overlay.put(b"q", b"other").unwrap();

        let found = overlay.scan_prefix(b"p").unwrap();
        assert_eq!(
            found,
            vec![
                (b"p1".to_vec(), b"base".to_vec()),
                (b"p2".to_vec(), b"new".to_vec()),
                (b"p3".to_vec(), b"changed".to_vec()),
            ]
        );
    }

    #[test]
    fn key_pages_skip_removed_base_pages() {
        let base = base_with(&[b"p1", b"p2", b"p3", b"p4"]);
        let overlay = OverlayStore::new(base);
        overlay.remove(b"p1").unwrap();
        overlay.remove(b"p2").unwrap();
        overlay.put(b"p25", b"new").unwrap();
        overlay.put(b"p9", b"new").unwrap();

        let first = overlay.scan_keys(b"p", Bound::Unbounded, 1).unwrap();
        assert_eq!(first, vec![b"p25".to_vec()]);

        let mut keys = Vec::new();
        let mut from: Option<Vec<u8>> = None;
        loop {
            let start = from.as_deref().map_or(Bound::Unbounded, Bound::Excluded);
            let page = overlay.scan_keys(b"p", start, 2).unwrap();
            let done = page.len() < 2;
            from = page.last().cloned();
            keys.extend(page);
            if done {
                break;
            }
        }
        let expected: Vec<Vec<u8>> = overlay
            .scan_prefix(b"p")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, expected);
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn apply_writes_through() {
        let base = base_with(&[b"gone"]);
        let overlay = OverlayStore::new(base.clone());
        overlay.put(b"kept", b"v").unwrap();
        overlay.remove(b"gone").unwrap();

        assert_eq!(overlay.apply().unwrap(), 2);
        assert_eq!(overlay.write_count(), 0);
        assert_eq!(base.get(b"kept").unwrap(), Some(b"v".to_vec()));
        assert!(base.get(b"gone").unwrap().is_none());
    }

    #[test]
    fn discard_drops_writes() {
        let base = base_with(&[]);
        let overlay = OverlayStore::new(base.clone());
        overlay.put(b"k", b"v").unwrap();
        assert_eq!(overlay.pending().len(), 1);

        overlay.discard();
        assert!(overlay.get(b"k").unwrap().is_none());
        assert!(base.is_empty());
    }
}
