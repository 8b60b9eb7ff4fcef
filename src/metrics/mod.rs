//! Metrics collection module
//!
//! Tracks search volume, per-type fetch times and error rates.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// Response times kept per type
const RESPONSE_WINDOW: usize = 100;

/// Search metrics shared across requests
pub struct Metrics {
    /// Searches that reached the backend
    pub total_searches: AtomicU64,
    /// Searches rejected during sanitization
    pub rejected_searches: AtomicU64,
    type_fetches: RwLock<HashMap<String, u64>>,
    type_rows: RwLock<HashMap<String, u64>>,
    /// Last response times in ms
    type_response_times: RwLock<HashMap<String, Vec<u64>>>,
    type_errors: RwLock<HashMap<String, u64>>,
    last_search_at: RwLock<Option<DateTime<Utc>>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            total_searches: AtomicU64::new(0),
            rejected_searches: AtomicU64::new(0),
            type_fetches: RwLock::new(HashMap::new()),
            type_rows: RwLock::new(HashMap::new()),
            type_response_times: RwLock::new(HashMap::new()),
            type_errors: RwLock::new(HashMap::new()),
            last_search_at: RwLock::new(None),
        }
    }

    /// Count a search that passed sanitization
    pub fn record_search(&self) {
        self.total_searches.fetch_add(1, Ordering::Relaxed);
        *self
            .last_search_at
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
    }

    pub fn record_rejected(&self) {
        self.rejected_searches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful fetch for one type
    pub fn record_fetch(&self, type_name: &str, elapsed: Duration, rows: usize) {
        {
            let mut fetches = self
                .type_fetches
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *fetches.entry(type_name.to_string()).or_insert(0) += 1;
        }
        {
            let mut counts = self
                .type_rows
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *counts.entry(type_name.to_string()).or_insert(0) += rows as u64;
        }

        let mut times = self
            .type_response_times
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = times.entry(type_name.to_string()).or_default();
        if entry.len() >= RESPONSE_WINDOW {
            entry.remove(0);
        }
        entry.push(elapsed.as_millis() as u64);
    }

    /// Record a failed fetch for one type
    pub fn record_error(&self, type_name: &str) {
        let mut errors = self
            .type_errors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *errors.entry(type_name.to_string()).or_insert(0) += 1;
    }

    pub fn get_total_searches(&self) -> u64 {
        self.total_searches.load(Ordering::Relaxed)
    }

    pub fn get_rejected_searches(&self) -> u64 {
        self.rejected_searches.load(Ordering::Relaxed)
    }

    pub fn last_search_at(&self) -> Option<DateTime<Utc>> {
        *self
            .last_search_at
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Average of the recent response times for a type
    pub fn get_avg_response_time(&self, type_name: &str) -> Option<u64> {
        let times = self
            .type_response_times
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        times.get(type_name).and_then(|t| {
            if t.is_empty() {
                None
            } else {
                Some(t.iter().sum::<u64>() / t.len() as u64)
            }
        })
    }

    /// Share of successful fetches as a percentage
    pub fn get_reliability(&self, type_name: &str) -> f64 {
        let fetches = self.count(&self.type_fetches, type_name);
        let errors = self.count(&self.type_errors, type_name);

        let total = fetches + errors;
        if total == 0 {
            100.0
        } else {
            (fetches as f64 / total as f64) * 100.0
        }
    }

    /// Statistics for every type seen so far
    pub fn get_type_stats(&self) -> HashMap<String, TypeStats> {
        let mut names: Vec<String> = self
            .type_fetches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.extend(
            self.type_errors
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .keys()
                .cloned(),
        );

        names
            .into_iter()
            .map(|name| {
                let stats = TypeStats {
                    fetches: self.count(&self.type_fetches, &name),
                    rows: self.count(&self.type_rows, &name),
                    errors: self.count(&self.type_errors, &name),
                    avg_response_time: self.get_avg_response_time(&name),
                    reliability: self.get_reliability(&name),
                };
                (name, stats)
            })
            .collect()
    }

    fn count(&self, map: &RwLock<HashMap<String, u64>>, type_name: &str) -> u64 {
        map.read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(type_name)
            .copied()
            .unwrap_or(0)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics for a single searchable type
#[derive(Debug, Clone, Serialize)]
pub struct TypeStats {
    pub fetches: u64,
    pub rows: u64,
    pub errors: u64,
    pub avg_response_time: Option<u64>,
    pub reliability: f64,
}
