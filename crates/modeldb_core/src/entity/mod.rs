//! Entity identifiers, key layout and handle contracts.

mod handle;
mod id;
pub(crate) mod layout;

pub use handle::{AccessorFactory, LiveHandle};
pub use id::EntityId;
