//! Application state shared across handlers

use crate::config::Settings;
use crate::metrics::Metrics;
use crate::search::Searchable;
use serde_json::Value;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Global settings
    pub settings: Arc<Settings>,
    /// Search service over config-driven types
    pub search: Arc<Searchable<Value>>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Create new application state
    pub fn new(settings: Settings, search: Searchable<Value>, metrics: Arc<Metrics>) -> Self {
        Self {
            settings: Arc::new(settings),
            search: Arc::new(search),
            metrics,
        }
    }

    pub fn instance_name(&self) -> &str {
        &self.settings.general.instance_name
    }

    /// Requested page size, falling back to the default and capped at the maximum
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or_else(|| self.search.default_per_page())
            .min(self.settings.search.max_per_page.max(1))
    }
}
