//! Transactions and the field views they hand out.
//!
//! A transaction buffers its writes over the database store and keeps
//! every index relation in step with the fields it changes:
//! - **Read-your-writes**: reads see the transaction's own buffered writes
//! - **Atomic commit**: buffered writes reach the store all at once
//! - **Fail fast**: a closed transaction rejects every operation

mod fields;
mod maintain;
mod state;
mod txn;

pub use fields::{FieldList, FieldMap, FieldSet};
pub use state::TransactionState;
pub use txn::Transaction;
