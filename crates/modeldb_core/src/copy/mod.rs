//! Cross-transaction graph copy.
//!
//! [`CopyEngine`] replicates an entity and the entities reachable from it
//! along [`ReferencePath`]s into another transaction, copying each entity
//! at most once per [`CopyState`].

mod engine;
mod path;
mod state;

pub use engine::CopyEngine;
pub use path::ReferencePath;
pub use state::CopyState;
