//! Untyped index relations read straight from the ordered store.

use crate::error::{CoreError, CoreResult};
use crate::view::{MapView, SetView, ViewIter};
use modeldb_codec::{decode_prefix, KeyEncoder, Value};
use std::collections::VecDeque;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

/// Keys fetched per scan while iterating a relation.
const PAGE_SIZE: usize = 64;

/// Read access to the ordered keys of a transaction.
pub trait KeySource: Send + Sync {
    /// Returns up to `limit` keys starting with `prefix`, beginning at
    /// `from`, in byte order. A page shorter than `limit` is the last.
    ///
    /// # Errors
    ///
    /// Returns `StaleTransaction` if the source is closed, or a storage
    /// error.
    fn scan_keys(
        &self,
        prefix: &[u8],
        from: Bound<&[u8]>,
        limit: usize,
    ) -> CoreResult<Vec<Vec<u8>>>;

    /// Returns true if any key starts with `prefix`.
    fn has_prefix(&self, prefix: &[u8]) -> CoreResult<bool> {
        Ok(!self.scan_keys(prefix, Bound::Unbounded, 1)?.is_empty())
    }
}

/// A raw ordered relation of value rows.
///
/// Each stored row has `stored` columns following `prefix`. Only the first
/// `visible` columns are exposed; rows that agree on the visible columns
/// appear once. Nothing is cached: every call scans the source again.
#[derive(Clone)]
pub struct RawIndex {
    source: Arc<dyn KeySource>,
    prefix: Vec<u8>,
    stored: usize,
    visible: usize,
}

impl RawIndex {
    /// Creates a relation over the rows under `prefix`, each with `arity`
    /// columns, all of them visible.
    pub fn new(source: Arc<dyn KeySource>, prefix: Vec<u8>, arity: usize) -> Self {
        Self {
            source,
            prefix,
            stored: arity,
            visible: arity,
        }
    }

    /// Number of visible columns.
    pub fn arity(&self) -> usize {
        self.visible
    }

    /// Number of stored columns, hidden ones included.
    pub fn stored_arity(&self) -> usize {
        self.stored
    }

    /// Fixes the leading columns to `values`, keeping the rest.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` unless at least one visible column
    /// remains.
    pub fn restrict(&self, values: &[Value]) -> CoreResult<Self> {
        if values.len() >= self.visible {
            return Err(CoreError::invalid_operation(format!(
                "cannot fix {} of {} visible columns",
                values.len(),
                self.visible
            )));
        }
        Ok(Self {
            source: Arc::clone(&self.source),
            prefix: self.prefix_with(values),
            stored: self.stored - values.len(),
            visible: self.visible - values.len(),
        })
    }

    /// Hides the trailing visible column.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if fewer than two columns are visible.
    pub fn project(&self) -> CoreResult<Self> {
        if self.visible < 2 {
            return Err(CoreError::invalid_operation(
                "cannot project a single-column relation",
            ));
        }
        Ok(Self {
            visible: self.visible - 1,
            ..self.clone()
        })
    }

    /// Groups rows by their first `width` columns.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` unless `width` leaves at least one visible
    /// column in each group.
    pub fn grouped(&self, width: usize) -> CoreResult<RawGroupedMap> {
        if width == 0 || width >= self.visible {
            return Err(CoreError::invalid_operation(format!(
                "cannot group {} visible columns by {width}",
                self.visible
            )));
        }
        Ok(RawGroupedMap {
            index: self.clone(),
            width,
        })
    }

    fn prefix_with(&self, values: &[Value]) -> Vec<u8> {
        let mut encoder = KeyEncoder::with_capacity(self.prefix.len() + 16 * values.len());
        encoder.raw(&self.prefix);
        for value in values {
            encoder.encode(value);
        }
        encoder.into_bytes()
    }

    /// Distinct leading `width`-column rows, in storage order.
    fn rows(&self, width: usize) -> ViewIter<'_, Vec<Value>> {
        Box::new(Rows {
            index: self,
            width,
            collapse: width < self.stored,
            page: VecDeque::new(),
            resume: Resume::Start,
            exhausted: false,
        })
    }

    fn has_row_prefix(&self, values: &[Value]) -> CoreResult<bool> {
        self.source.has_prefix(&self.prefix_with(values))
    }
}

/// Where the next page of a scan begins.
enum Resume {
    Start,
    After(Vec<u8>),
    From(Vec<u8>),
}

/// Streams the rows of a relation a page of keys at a time.
///
/// When rows collapse, the scan jumps past every key of a row once it has
/// been yielded instead of reading the rest of them.
struct Rows<'a> {
    index: &'a RawIndex,
    width: usize,
    collapse: bool,
    page: VecDeque<Vec<u8>>,
    resume: Resume,
    exhausted: bool,
}

impl Rows<'_> {
    fn fill(&mut self) -> CoreResult<()> {
        let from = match &self.resume {
            Resume::Start => Bound::Unbounded,
            Resume::After(key) => Bound::Excluded(key.as_slice()),
            Resume::From(key) => Bound::Included(key.as_slice()),
        };
        let keys = self
            .index
            .source
            .scan_keys(&self.index.prefix, from, PAGE_SIZE)?;
        self.exhausted = keys.len() < PAGE_SIZE;
        self.page = keys.into();
        Ok(())
    }
}

impl Iterator for Rows<'_> {
    type Item = CoreResult<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.page.is_empty() {
            if self.exhausted {
                return None;
            }
            if let Err(err) = self.fill() {
                self.exhausted = true;
                return Some(Err(err));
            }
        }
        let key = self.page.pop_front()?;
        let row = match decode_prefix(&key[self.index.prefix.len()..], self.width) {
            Ok((row, _)) => row,
            Err(err) => {
                self.exhausted = true;
                self.page.clear();
                return Some(Err(CoreError::from(err)));
            }
        };
        if self.collapse {
            let group = self.index.prefix_with(&row);
            while self.page.front().is_some_and(|next| next.starts_with(&group)) {
                self.page.pop_front();
            }
            match successor(&group) {
                Some(next) => self.resume = Resume::From(next),
                None => self.exhausted = true,
            }
        } else {
            self.resume = Resume::After(key);
        }
        Some(Ok(row))
    }
}

/// The smallest key greater than every key starting with `prefix`.
fn successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut next = prefix.to_vec();
    while let Some(last) = next.pop() {
        if last < u8::MAX {
            next.push(last + 1);
            return Some(next);
        }
    }
    None
}

impl fmt::Debug for RawIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawIndex")
            .field("prefix", &self.prefix)
            .field("stored", &self.stored)
            .field("visible", &self.visible)
            .finish()
    }
}

impl SetView<Vec<Value>> for RawIndex {
    fn iter(&self) -> ViewIter<'_, Vec<Value>> {
        self.rows(self.visible)
    }

    fn contains(&self, row: &Vec<Value>) -> CoreResult<bool> {
        if row.len() != self.visible {
            return Ok(false);
        }
        self.has_row_prefix(row)
    }
}

/// A raw relation grouped by its leading columns.
///
/// Maps each distinct leading row to the relation of the remaining
/// columns.
#[derive(Debug, Clone)]
pub struct RawGroupedMap {
    index: RawIndex,
    width: usize,
}

impl MapView<Vec<Value>, RawIndex> for RawGroupedMap {
    fn iter(&self) -> ViewIter<'_, (Vec<Value>, RawIndex)> {
        Box::new(self.index.rows(self.width).map(move |row| -> CoreResult<_> {
            let row = row?;
            let group = self.index.restrict(&row)?;
            Ok((row, group))
        }))
    }

    fn get(&self, key: &Vec<Value>) -> CoreResult<Option<RawIndex>> {
        if key.len() != self.width || !self.index.has_row_prefix(key)? {
            return Ok(None);
        }
        self.index.restrict(key).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::layout::{index_key, index_prefix};
    use crate::entity::EntityId;
    use crate::types::StorageSlot;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Sorted keys plus a count of scans served.
    struct Keys(BTreeSet<Vec<u8>>, AtomicUsize);

    impl KeySource for Keys {
        fn scan_keys(
            &self,
            prefix: &[u8],
            from: Bound<&[u8]>,
            limit: usize,
        ) -> CoreResult<Vec<Vec<u8>>> {
            self.1.fetch_add(1, Ordering::Relaxed);
            let from = match from {
                Bound::Included(key) => Bound::Included(key.to_vec()),
                Bound::Excluded(key) => Bound::Excluded(key.to_vec()),
                Bound::Unbounded => Bound::Included(prefix.to_vec()),
            };
            Ok(self
                .0
                .range((from, Bound::Unbounded))
                .skip_while(|k| k.as_slice() < prefix)
                .take_while(|k| k.starts_with(prefix))
                .take(limit)
                .cloned()
                .collect())
        }
    }

    fn id(n: u8) -> EntityId {
        EntityId::from_bytes([n; 16])
    }

    fn target(n: u8) -> Value {
        Value::Reference([n; 16])
    }

    fn relation(rows: Vec<(Vec<Value>, u8)>) -> (RawIndex, Arc<Keys>) {
        let slot = StorageSlot::new(31);
        let keys = rows
            .into_iter()
            .map(|(cols, n)| index_key(slot, &cols, id(n)))
            .collect();
        let source = Arc::new(Keys(keys, AtomicUsize::new(0)));
        let raw = RawIndex::new(source.clone(), index_prefix(slot), 4);
        (raw, source)
    }

    fn sample() -> RawIndex {
        relation(vec![
            (vec![Value::Integer(1), Value::text("x"), Value::text("p")], 1),
            (vec![Value::Integer(1), Value::text("x"), Value::text("q")], 2),
            (vec![Value::Integer(2), Value::text("y"), Value::text("p")], 3),
        ])
        .0
    }

    #[test]
    fn rows_come_back_in_storage_order() {
        let rows = sample().to_vec().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            vec![Value::Integer(1), Value::text("x"), Value::text("p"), target(1)]
        );
        assert_eq!(rows[2][0], Value::Integer(2));
    }

    #[test]
    fn projection_collapses_equal_rows() {
        let projected = sample().project().unwrap().project().unwrap();
        assert_eq!(
            projected.to_vec().unwrap(),
            vec![
                vec![Value::Integer(1), Value::text("x")],
                vec![Value::Integer(2), Value::text("y")],
            ]
        );
        assert!(projected
            .contains(&vec![Value::Integer(1), Value::text("x")])
            .unwrap());
        assert!(!projected
            .contains(&vec![Value::Integer(1), Value::text("y")])
            .unwrap());
    }

    #[test]
    fn grouping_restricts_each_group() {
        let grouped = sample().grouped(1).unwrap();
        let groups = grouped.to_vec().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, vec![Value::Integer(1)]);
        assert_eq!(groups[0].1.len().unwrap(), 2);
        assert_eq!(groups[1].1.arity(), 3);

        let missing = grouped.get(&vec![Value::Integer(9)]).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn invalid_shapes_are_rejected() {
        let raw = sample();
        assert!(raw.grouped(4).is_err());
        assert!(raw.restrict(&vec![Value::Null; 4]).is_err());
        assert!(!raw.contains(&vec![Value::Integer(1)]).unwrap());
        assert!(matches!(raw.insert(vec![]), Err(CoreError::ReadOnlyView)));
    }

    #[test]
    fn rows_stream_across_pages() {
        let rows = (0..200u8)
            .map(|n| (vec![Value::Integer(i64::from(n)), Value::text("c"), Value::Null], n))
            .collect();
        let (raw, source) = relation(rows);

        let first = raw.iter().next().unwrap().unwrap();
        assert_eq!(first[0], Value::Integer(0));
        assert_eq!(source.1.load(Ordering::Relaxed), 1);

        let all = raw.to_vec().unwrap();
        assert_eq!(all.len(), 200);
        assert!(all.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn collapsed_rows_skip_whole_groups() {
        let rows = (0..200u8)
            .map(|n| (vec![Value::Integer(i64::from(n % 2)), Value::text("c"), Value::Null], n))
            .collect();
        let (raw, source) = relation(rows);
        let grouped = raw.grouped(1).unwrap();

        let keys: Vec<_> = grouped.keys().collect::<CoreResult<_>>().unwrap();
        assert_eq!(keys, vec![vec![Value::Integer(0)], vec![Value::Integer(1)]]);
        // One scan per group, then one that finds nothing.
        assert_eq!(source.1.load(Ordering::Relaxed), 3);
    }
}
