//! Result container for merging rows from several searchable types

use super::types::Timing;
use crate::backend::{MatchSet, Row};
use std::cmp::Ordering;

/// A matched row tagged with where it came from
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Registration index of the source type
    pub source: usize,
    /// Position within the source's fetched rows
    pub position: usize,
    pub row: Row,
}

/// Collects per-type match sets and ranks them into one list
#[derive(Debug, Default)]
pub struct ResultContainer {
    candidates: Vec<Candidate>,
    total: u64,
    timings: Vec<Timing>,
}

impl ResultContainer {
    /// Create a new empty result container
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the rows one type returned. Its match count adds to the total.
    pub fn add_match_set(&mut self, source: usize, set: MatchSet) {
        self.total += set.total;
        self.candidates.extend(
            set.rows
                .into_iter()
                .enumerate()
                .map(|(position, row)| Candidate {
                    source,
                    position,
                    row,
                }),
        );
    }

    pub fn add_timing(&mut self, timing: Timing) {
        self.timings.push(timing);
    }

    /// Sum of per-type match counts
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of rows held
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn timings(&self) -> &[Timing] {
        &self.timings
    }

    /// All rows, best score first.
    ///
    /// Ties go to the earlier registered type, then the earlier fetched row,
    /// so the order does not depend on which fetch finished first.
    pub fn into_ordered(self) -> Vec<Candidate> {
        let mut candidates = self.candidates;
        candidates.sort_by(Self::rank);
        candidates
    }

    /// One page of the ordered rows. Pages are 1-indexed.
    pub fn into_page(self, per_page: u64, page: u64) -> Vec<Candidate> {
        let start = page.saturating_sub(1).saturating_mul(per_page);
        let start = usize::try_from(start).unwrap_or(usize::MAX);
        let per_page = usize::try_from(per_page).unwrap_or(usize::MAX);

        self.into_ordered()
            .into_iter()
            .skip(start)
            .take(per_page)
            .collect()
    }

    fn rank(a: &Candidate, b: &Candidate) -> Ordering {
        b.row
            .score
            .total_cmp(&a.row.score)
            .then(a.source.cmp(&b.source))
            .then(a.position.cmp(&b.position))
    }
}
