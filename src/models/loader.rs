//! Type loader for building searchable types from configuration

use super::registry::TypeRegistry;
use super::searchable::SearchableType;
use crate::backend::Row;
use crate::config::{Settings, TypeConfig};
use anyhow::{bail, Result};
use serde_json::Value;
use tracing::{info, warn};

/// Loader for searchable types declared in settings
pub struct TypeLoader;

impl TypeLoader {
    /// Load all enabled types from settings.
    ///
    /// Invalid entries are skipped with a warning.
    pub fn load(settings: &Settings) -> TypeRegistry<Value> {
        let mut types = Vec::new();

        for config in &settings.types {
            if config.disabled {
                info!("Skipping disabled type: {}", config.name);
                continue;
            }

            match Self::create_type(config) {
                Ok(searchable) => {
                    info!("Loaded type: {} ({})", config.name, config.collection);
                    types.push(searchable);
                }
                Err(e) => {
                    warn!("Failed to load type {}: {}", config.name, e);
                }
            }
        }

        let registry = TypeRegistry::new();
        registry.register(types);
        info!("Loaded {} searchable types", registry.len());
        registry
    }

    /// Build a JSON-valued type from its configuration
    pub fn create_type(config: &TypeConfig) -> Result<SearchableType<Value>> {
        if config.name.is_empty() {
            bail!("Type name is required");
        }
        if config.collection.is_empty() {
            bail!("Collection is required for type {}", config.name);
        }
        if config.fields.is_empty() {
            bail!("At least one fulltext field is required for type {}", config.name);
        }

        let mut searchable = SearchableType::new(
            config.name.clone(),
            config.collection.clone(),
            config.fields.clone(),
            |row: &Row| Ok(row.to_value()),
        );

        for relation in &config.relations {
            searchable = searchable.with_relation(relation.clone());
        }

        let conditions = config.conditions()?;
        if !conditions.is_empty() {
            searchable = searchable.with_filter(move |mut query| {
                query.conditions.extend(conditions.iter().cloned());
                Some(query)
            });
        }

        Ok(searchable)
    }
}
