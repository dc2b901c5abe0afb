//! Typed views over ordered index relations.
//!
//! An index of arity N stores rows `(v1, .., vN, target)` under one key
//! prefix, ordered by the encoded columns. The same relation can be read
//! as:
//!
//! - a flat set of converted rows ([`Index2::as_flat_set`])
//! - a map from key tuples to target sets ([`Index2::as_grouped_map`])
//! - a map from leading columns to narrower indexes ([`Index3::group_by_1`])
//! - a narrower index with the target hidden ([`Index3::as_index`])
//!
//! Each view relabels the raw rows through converters; none of them copies
//! rows or reorders them, and all of them are read-only.
//!
//! ```rust
//! use std::ops::Bound;
//! use std::sync::Arc;
//! use modeldb_codec::Value;
//! use modeldb_core::convert::ValueConverter;
//! use modeldb_core::index::{ColumnConverter, Index1, KeySource, RawIndex};
//! use modeldb_core::view::SetView;
//! use modeldb_core::CoreResult;
//!
//! struct Empty;
//!
//! impl KeySource for Empty {
//!     fn scan_keys(&self, _: &[u8], _: Bound<&[u8]>, _: usize) -> CoreResult<Vec<Vec<u8>>> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! let ints: ColumnConverter<i64> = Arc::new(ValueConverter::<i64>::new());
//! let raw = RawIndex::new(Arc::new(Empty), vec![0x20], 2);
//! let index = Index1::new(raw, Arc::clone(&ints), ints).unwrap();
//! assert!(index.as_flat_set().is_empty().unwrap());
//! assert!(index.targets(&3).unwrap().to_vec().unwrap().is_empty());
//! ```

mod raw;
mod typed;

pub use raw::{KeySource, RawGroupedMap, RawIndex};
pub use typed::{ColumnConverter, Index1, Index2, Index3, Index4, IndexConverter, TypedIndex};
