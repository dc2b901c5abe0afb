//! # ModelDB Testkit
//!
//! Test utilities for ModelDB.
//!
//! This crate provides:
//! - A sample schema with people and pets, and helpers to open it
//! - A live handle type and an instrumented accessor factory
//! - Property-based test generators using proptest
//! - Concurrent lookup stress helpers
//!
//! ## Usage
//!
//! ```rust
//! use modeldb_testkit::prelude::*;
//!
//! with_people(|db| {
//!     let txn = db.begin();
//!     let ada = create_person(&txn, "Ada", 36).unwrap();
//!     let cache = txn.entity_cache(ModelFactory::shared()).unwrap();
//!     assert_eq!(cache.get(ada).unwrap().name().unwrap(), "Ada");
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::init_tracing;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;

/// Installs a global `fmt` subscriber filtered by `RUST_LOG`.
///
/// Defaults to `warn` when `RUST_LOG` is unset. Safe to call from every
/// test; only the first call installs anything.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
