//! Result types and container for search results
//!
//! Rows from every participating type are merged here and ranked by score.

mod container;
mod types;

pub use container::{Candidate, ResultContainer};
pub use types::*;
