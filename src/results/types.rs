//! Result type definitions

use serde::{Deserialize, Serialize};

/// A decoded record with its relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord<R> {
    pub record: R,
    pub score: f64,
    /// Name of the searchable type the record came from
    #[serde(rename = "type")]
    pub source: String,
    /// Registration index of that type
    #[serde(skip)]
    pub source_index: usize,
    /// Relations that were eager loaded, present or not
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<String>,
}

impl<R> ScoredRecord<R> {
    pub fn relation_loaded(&self, name: &str) -> bool {
        self.relations.iter().any(|r| r == name)
    }

    /// Transform the record, keeping score and source
    pub fn map<T>(self, f: impl FnOnce(R) -> T) -> ScoredRecord<T> {
        ScoredRecord {
            record: f(self.record),
            score: self.score,
            source: self.source,
            source_index: self.source_index,
            relations: self.relations,
        }
    }
}

/// Time spent fetching one type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timing {
    /// Searchable type name
    pub source: String,
    /// Response time in milliseconds
    pub time_ms: u64,
    /// Number of rows returned
    pub result_count: usize,
}

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult<R> {
    pub items: Vec<ScoredRecord<R>>,
    /// Matches across all pages
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    #[serde(default)]
    pub timings: Vec<Timing>,
}

impl<R> SearchResult<R> {
    pub fn new(items: Vec<ScoredRecord<R>>, total: u64, per_page: u64, current_page: u64) -> Self {
        Self {
            items,
            total,
            per_page,
            current_page,
            timings: Vec::new(),
        }
    }

    pub fn empty(per_page: u64, current_page: u64) -> Self {
        Self::new(Vec::new(), 0, per_page, current_page)
    }

    pub fn with_timings(mut self, timings: Vec<Timing>) -> Self {
        self.timings = timings;
        self
    }

    /// Last page number, at least 1
    pub fn last_page(&self) -> u64 {
        if self.per_page == 0 {
            return 1;
        }
        self.total.div_ceil(self.per_page).max(1)
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredRecord<R>> {
        self.items.iter()
    }

    pub fn records(&self) -> impl Iterator<Item = &R> {
        self.items.iter().map(|item| &item.record)
    }

    pub fn into_records(self) -> Vec<R> {
        self.items.into_iter().map(|item| item.record).collect()
    }
}

impl<R> IntoIterator for SearchResult<R> {
    type Item = ScoredRecord<R>;
    type IntoIter = std::vec::IntoIter<ScoredRecord<R>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
