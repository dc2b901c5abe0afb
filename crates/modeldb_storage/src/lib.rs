//! # ModelDB Storage
//!
//! Ordered key/value store abstraction for ModelDB.
//!
//! This crate provides the lowest-level storage abstraction for ModelDB.
//! Stores are **opaque ordered byte maps** - they do not interpret the
//! keys or values they hold.
//!
//! ## Design Principles
//!
//! - Keys sort byte-lexicographically
//! - Prefix scans return entries in key order
//! - No knowledge of entities, fields or indexes
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral databases
//! - [`OverlayStore`] - Transaction-local write buffer over another store
//!
//! ## Example
//!
//! ```rust
//! use modeldb_storage::{InMemoryStore, OrderedStore};
//!
//! let store = InMemoryStore::new();
//! store.put(b"user/2", b"bob").unwrap();
//! store.put(b"user/1", b"alice").unwrap();
//!
//! let users = store.scan_prefix(b"user/").unwrap();
//! assert_eq!(users[0].1, b"alice");
//! assert_eq!(users[1].1, b"bob");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod memory;
mod overlay;

pub use backend::OrderedStore;
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStore;
pub use overlay::{OverlayStore, PendingWrite};
