//! Search module
//!
//! Builds one query per searchable type, runs them against the backend and
//! merges the results into a single ranked page.

mod builder;
mod error;
mod executor;
mod options;

pub use builder::QueryBuilder;
pub use error::SearchError;
pub use executor::{PendingSearch, Searchable};
pub use options::{EagerLoad, FilterBypass, RelationConstraint, SearchOptions};
