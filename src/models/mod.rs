//! Searchable type module
//!
//! Describes the record types taking part in a search and keeps them in a
//! registry.

mod loader;
mod registry;
mod searchable;

pub use loader::TypeLoader;
pub use registry::TypeRegistry;
pub use searchable::*;
