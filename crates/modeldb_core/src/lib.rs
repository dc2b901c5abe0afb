//! # ModelDB Core
//!
//! Typed entity access over an ordered key-value store.
//!
//! This crate provides:
//! - Field identity across model types ([`field_info`])
//! - Invertible, order-preserving converters ([`convert`])
//! - Typed views over index relations of one to four columns ([`index`])
//! - A per-transaction entity identity cache ([`cache`])
//! - Cycle-safe copying of entity graphs between transactions ([`copy`])
//!
//! ## Key Layout
//!
//! ```text
//! entity    0x10 | entity id (16)
//! field     0x10 | entity id (16) | field slot (4)
//! element   0x10 | entity id (16) | field slot (4) | enc(element)
//! index row 0x20 | index slot (4) | enc(v1) .. enc(vN) | enc(target)
//! ```
//!
//! Entity IDs start with the big-endian slot of their model type, so all
//! entities of one type are contiguous. Index rows sort by their encoded
//! columns, which sort like the values themselves.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
mod config;
pub mod convert;
pub mod copy;
mod database;
mod entity;
mod error;
pub mod field_info;
pub mod index;
pub mod schema;
mod transaction;
mod types;
pub mod view;

pub use cache::EntityCache;
pub use config::Config;
pub use copy::{CopyEngine, CopyState, ReferencePath};
pub use database::Database;
pub use entity::{AccessorFactory, EntityId, LiveHandle};
pub use error::{BoxError, CoreError, CoreResult};
pub use schema::{Schema, SchemaBinder, SchemaBuilder};
pub use transaction::{FieldList, FieldMap, FieldSet, Transaction, TransactionState};
pub use types::{StorageSlot, TransactionId};
