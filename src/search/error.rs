//! Search error types

use crate::backend::BackendError;
use thiserror::Error;

/// Why a search call failed
#[derive(Debug, Error)]
pub enum SearchError {
    /// Rejected before any backend call
    #[error("Search query must be at least {min} characters long, got {actual}")]
    QueryTooShort { min: usize, actual: usize },

    #[error("Backend failed for type {type_name}: {source}")]
    Backend {
        type_name: String,
        #[source]
        source: BackendError,
    },

    #[error("Failed to decode {type_name} record: {source}")]
    Decode {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Type {type_name} has no relation named {relation}")]
    UnknownRelation { type_name: String, relation: String },

    #[error("Unknown searchable type: {0}")]
    UnknownType(String),

    #[error("Invalid pagination: per_page={per_page}, page={page}")]
    InvalidPage { per_page: u64, page: u64 },
}
