//! Storage backend module
//!
//! Defines the Backend trait, the fulltext query model and the bundled
//! in-memory and SQLite backends.

mod memory;
mod sqlite;
pub mod term;
mod traits;

pub use memory::MemoryBackend;
pub use sqlite::{fts5_expression, SqliteBackend};
pub use traits::*;
