//! searchable-rs: fulltext search across several record types at once
//!
//! Each registered type is queried with the same sanitized term, the rows are
//! merged by relevance score and returned as one paginated list. Storage is
//! abstracted behind the [`backend::Backend`] trait, with an in-memory backend
//! and a SQLite FTS5 backend bundled.

pub mod backend;
pub mod config;
pub mod metrics;
pub mod models;
pub mod query;
pub mod results;
pub mod search;
pub mod web;

pub use backend::{Backend, MemoryBackend, SqliteBackend, TextMatchQuery};
pub use config::Settings;
pub use models::{SearchableType, TypeRegistry};
pub use results::{ScoredRecord, SearchResult};
pub use search::{EagerLoad, SearchError, SearchOptions, Searchable};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
