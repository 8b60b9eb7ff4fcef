//! Registry of searchable types

use super::searchable::SearchableType;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::warn;

/// Ordered list of searchable types.
///
/// Registration order breaks score ties when results are merged.
pub struct TypeRegistry<R> {
    types: RwLock<Vec<Arc<SearchableType<R>>>>,
}

impl<R> TypeRegistry<R> {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: RwLock::new(Vec::new()),
        }
    }

    /// Replace the registered types
    pub fn register(&self, types: Vec<SearchableType<R>>) {
        self.register_shared(types.into_iter().map(Arc::new).collect());
    }

    /// Replace the registered types with already shared ones
    pub fn register_shared(&self, types: Vec<Arc<SearchableType<R>>>) {
        let mut deduped: Vec<Arc<SearchableType<R>>> = Vec::with_capacity(types.len());
        for t in types {
            if let Some(existing) = deduped.iter_mut().find(|e| e.name() == t.name()) {
                warn!("Type {} registered twice, keeping the later one", t.name());
                *existing = t;
            } else {
                deduped.push(t);
            }
        }

        *self.types.write().unwrap_or_else(PoisonError::into_inner) = deduped;
    }

    /// Append a type, replacing any type with the same name in place
    pub fn push(&self, searchable: SearchableType<R>) {
        let searchable = Arc::new(searchable);
        let mut types = self.types.write().unwrap_or_else(PoisonError::into_inner);

        match types.iter_mut().find(|t| t.name() == searchable.name()) {
            Some(existing) => *existing = searchable,
            None => types.push(searchable),
        }
    }

    /// Snapshot of the registered types, in registration order
    pub fn list(&self) -> Vec<Arc<SearchableType<R>>> {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get a type by name
    pub fn get(&self, name: &str) -> Option<Arc<SearchableType<R>>> {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|t| t.name() == name)
            .cloned()
    }

    /// Get all type names
    pub fn names(&self) -> Vec<String> {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|t| t.name().to_string())
            .collect()
    }

    /// Check if a type exists
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get number of registered types
    pub fn len(&self) -> usize {
        self.types.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R> Default for TypeRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}
