//! # ModelDB Codec
//!
//! Order-preserving key encoding for ModelDB.
//!
//! This crate turns storage [`Value`]s and tuples of them into byte strings
//! whose lexicographic order matches the value order, so an ordered
//! key/value store can serve range and prefix scans over typed data.
//!
//! ## Encoding Rules
//!
//! - Every value starts with a one-byte type tag; tags sort in kind order
//! - Integers are 8 bytes big-endian with the sign bit flipped
//! - Text and bytes escape `0x00` as `0x00 0xFF` and end with `0x00 0x00`
//! - Enums are a 4-byte big-endian ordinal followed by the escaped name
//! - References are their 16 identifier bytes
//! - Tuples are the concatenation of their components
//!
//! The encoding is self-delimiting, so no tuple encoding is a proper prefix
//! of an encoding that differs in an earlier component.
//!
//! ## Usage
//!
//! ```
//! use modeldb_codec::{decode_tuple, encode_tuple, Value};
//!
//! let low = encode_tuple(&[Value::Integer(1), Value::text("b")]);
//! let high = encode_tuple(&[Value::Integer(2), Value::text("a")]);
//! assert!(low < high);
//!
//! let decoded = decode_tuple(&low).unwrap();
//! assert_eq!(decoded, vec![Value::Integer(1), Value::text("b")]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::{decode_prefix, decode_tuple, decode_value, KeyDecoder};
pub use encoder::{encode_tuple, encode_value, KeyEncoder};
pub use error::{CodecError, CodecResult};
pub use value::Value;
