//! In-memory backend over JSON rows
//!
//! Scores are the number of token occurrences across the queried fields.
//! Rows with equal scores keep insertion order.

use super::term::{words, MatchExpression, Token};
use super::traits::*;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

/// Collections of JSON rows searched by token matching
#[derive(Debug, Default)]
pub struct MemoryBackend {
    collections: RwLock<HashMap<String, Vec<Record>>>,
    calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MemoryBackend::insert_all`]
    pub fn with_collection(self, name: &str, rows: impl IntoIterator<Item = Value>) -> Self {
        self.insert_all(name, rows);
        self
    }

    /// Append rows to a collection, creating it if needed.
    ///
    /// Non-object values are skipped.
    pub fn insert_all(&self, name: &str, rows: impl IntoIterator<Item = Value>) {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let collection = collections.entry(name.to_string()).or_default();

        for row in rows {
            match row {
                Value::Object(record) => collection.push(record),
                other => warn!("Skipping non-object row in {}: {}", name, other),
            }
        }
    }

    pub fn insert(&self, name: &str, row: Value) {
        self.insert_all(name, std::iter::once(row));
    }

    /// Number of queries executed so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn score(expression: &MatchExpression, fields: &[String], record: &Record) -> Option<f64> {
        let field_words: Vec<String> = fields
            .iter()
            .filter_map(|field| record.get(field))
            .flat_map(|value| match value {
                Value::String(text) => words(text),
                Value::Null => Vec::new(),
                other => words(&other.to_string()),
            })
            .collect();

        let occurrences = |token: &Token| field_words.iter().filter(|w| token.matches(w)).count();

        if expression.excluded.iter().any(|t| occurrences(t) > 0) {
            return None;
        }
        if expression.required.iter().any(|t| occurrences(t) == 0) {
            return None;
        }

        let score: usize = expression.positive().map(|t| occurrences(t)).sum();
        if score == 0 {
            return None;
        }

        Some(score as f64)
    }

    fn load_relation(
        collections: &HashMap<String, Vec<Record>>,
        load: &RelationLoad,
        rows: &mut [Row],
    ) -> Result<(), BackendError> {
        let relation = &load.relation;
        let candidates: Vec<Record> = collections
            .get(&relation.collection)
            .ok_or_else(|| BackendError::UnknownCollection(relation.collection.clone()))?
            .iter()
            .filter(|record| load.accepts(record))
            .cloned()
            .collect();

        for row in rows.iter_mut() {
            let related = relation.link(&row.columns, &candidates);
            row.relations.insert(load.name().to_string(), related);
        }

        Ok(())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn execute(&self, query: &TextMatchQuery) -> Result<MatchSet, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let records = collections
            .get(&query.collection)
            .ok_or_else(|| BackendError::UnknownCollection(query.collection.clone()))?;

        let expression = MatchExpression::parse(&query.term, query.mode);
        if expression.is_unmatchable() {
            debug!("Term '{}' has nothing to match", query.term);
            return Ok(MatchSet::empty());
        }

        let mut matched: Vec<(f64, &Record)> = records
            .iter()
            .filter(|record| query.conditions.iter().all(|c| c.matches(record)))
            .filter_map(|record| {
                Self::score(&expression, &query.fields, record).map(|score| (score, record))
            })
            .collect();

        // Stable, so equal scores keep insertion order
        matched.sort_by(|a, b| b.0.total_cmp(&a.0));

        let total = matched.len() as u64;
        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map_or(usize::MAX, |l| l as usize);

        let mut rows: Vec<Row> = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(score, record)| Row::new(record.clone(), score))
            .collect();

        for load in &query.relations {
            Self::load_relation(&collections, load, &mut rows)?;
        }

        Ok(MatchSet { rows, total })
    }
}
