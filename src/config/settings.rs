//! Settings structures for searchable-rs configuration

use crate::backend::{Comparison, Condition, Relation};
use crate::query::WildcardWrap;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main settings structure, mirrors `settings.yml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub search: SearchSettings,
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub types: Vec<TypeConfig>,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse settings from a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(content)?;
        Ok(settings)
    }

    /// Merge with environment variables (SEARCHABLE_* prefix)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("SEARCHABLE_DEBUG") {
            self.general.debug = val.parse().unwrap_or(false);
        }
        if let Ok(val) = std::env::var("SEARCHABLE_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("SEARCHABLE_BIND_ADDRESS") {
            self.server.bind_address = val;
        }
        if let Ok(val) = std::env::var("SEARCHABLE_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("SEARCHABLE_BOOLEAN_MODE") {
            if let Ok(flag) = val.parse() {
                self.search.boolean_mode = flag;
            }
        }
        if let Ok(val) = std::env::var("SEARCHABLE_PER_PAGE") {
            if let Ok(per_page) = val.parse() {
                self.search.per_page = per_page;
            }
        }
    }

    /// Get type config by name
    pub fn get_type(&self, name: &str) -> Option<&TypeConfig> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Get all enabled types
    pub fn enabled_types(&self) -> Vec<&TypeConfig> {
        self.types.iter().filter(|t| !t.disabled).collect()
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Enable debug mode
    pub debug: bool,
    /// Instance name reported by `/health`
    pub instance_name: String,
    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            debug: false,
            instance_name: "searchable-rs".to_string(),
            enable_metrics: true,
        }
    }
}

/// Search behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Use boolean match mode (operators, prefix matching)
    pub boolean_mode: bool,
    /// Broaden natural language matches; ignored in boolean mode
    pub query_expansion: bool,
    /// Keep `+`, `-` and `*` operators; ignored outside boolean mode
    pub allow_operators: bool,
    /// Wildcards added around the sanitized term
    pub wildcard: WildcardWrap,
    /// Default page size
    pub per_page: u64,
    /// Upper bound accepted from callers
    pub max_per_page: u64,
    /// Minimum sanitized query length, in characters
    pub min_query_length: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            boolean_mode: true,
            query_expansion: true,
            allow_operators: true,
            wildcard: WildcardWrap::default(),
            per_page: 15,
            max_per_page: 100,
            min_query_length: 3,
        }
    }
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server port
    pub port: u16,
    /// Bind address
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8888,
            bind_address: "127.0.0.1".to_string(),
        }
    }
}

/// Database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite connection URL
    pub url: String,
    /// Pool size
    pub max_connections: u32,
    /// Create the database file when missing
    pub create_if_missing: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://searchable.db".to_string(),
            max_connections: 5,
            create_if_missing: true,
        }
    }
}

/// Individual searchable type configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeConfig {
    /// Type name (unique identifier)
    pub name: String,
    /// Backing table or collection
    pub collection: String,
    /// Fulltext-indexed fields
    pub fields: Vec<String>,
    /// Associations available for eager loading
    pub relations: Vec<Relation>,
    /// Predefined filter applied to every search of this type
    pub filters: Vec<FilterConfig>,
    /// Whether type is disabled
    pub disabled: bool,
}

impl TypeConfig {
    /// Convert the declarative filters into query conditions
    pub fn conditions(&self) -> Result<Vec<Condition>> {
        self.filters.iter().map(FilterConfig::to_condition).collect()
    }
}

/// Filter operator as written in settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "=", alias = "eq")]
    Eq,
    #[serde(rename = "!=", alias = "not_eq")]
    NotEq,
    #[serde(rename = ">", alias = "gt")]
    Gt,
    #[serde(rename = ">=", alias = "gte")]
    Gte,
    #[serde(rename = "<", alias = "lt")]
    Lt,
    #[serde(rename = "<=", alias = "lte")]
    Lte,
    #[serde(rename = "is_null")]
    IsNull,
    #[serde(rename = "not_null")]
    NotNull,
}

/// One predicate of a type's predefined filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub column: String,
    pub op: FilterOp,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl FilterConfig {
    pub fn to_condition(&self) -> Result<Condition> {
        let op = match self.op {
            FilterOp::IsNull => return Ok(Condition::IsNull(self.column.clone())),
            FilterOp::NotNull => return Ok(Condition::NotNull(self.column.clone())),
            FilterOp::Eq => Comparison::Eq,
            FilterOp::NotEq => Comparison::NotEq,
            FilterOp::Gt => Comparison::Gt,
            FilterOp::Gte => Comparison::Gte,
            FilterOp::Lt => Comparison::Lt,
            FilterOp::Lte => Comparison::Lte,
        };

        if self.value.is_null() {
            bail!("Filter on '{}' needs a value", self.column);
        }

        Ok(Condition::Compare {
            column: self.column.clone(),
            op,
            value: self.value.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RelationKind;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8888);
        assert!(!settings.general.debug);
        assert!(settings.search.boolean_mode);
        assert!(settings.search.allow_operators);
        assert_eq!(settings.search.wildcard, WildcardWrap::BothSides);
        assert_eq!(settings.search.per_page, 15);
        assert_eq!(settings.search.min_query_length, 3);
        assert!(settings.types.is_empty());
    }

    #[test]
    fn test_yaml_loading() {
        let yaml = r#"
search:
  boolean_mode: false
  wildcard: suffix_only
types:
  - name: post
    collection: posts
    fields: [title, description]
    filters:
      - { column: published_at, op: not_null }
      - { column: published_at, op: ">", value: "2019-12-31 23:59:59" }
  - name: article
    collection: articles
    fields: [title, description]
    relations:
      - name: author
        collection: users
        kind: belongs_to
        local_key: created_by
        foreign_key: id
  - name: draft
    collection: drafts
    fields: [body]
    disabled: true
"#;
        let settings = Settings::from_yaml(yaml).unwrap();

        assert!(!settings.search.boolean_mode);
        assert_eq!(settings.search.wildcard, WildcardWrap::SuffixOnly);
        // Untouched sections keep their defaults
        assert_eq!(settings.search.per_page, 15);
        assert_eq!(settings.server.port, 8888);

        assert_eq!(settings.types.len(), 3);
        assert_eq!(settings.enabled_types().len(), 2);

        let post = settings.get_type("post").unwrap();
        let conditions = post.conditions().unwrap();
        assert_eq!(conditions.len(), 2);
        assert!(matches!(&conditions[0], Condition::NotNull(c) if c == "published_at"));
        assert!(matches!(
            &conditions[1],
            Condition::Compare { op: Comparison::Gt, .. }
        ));

        let article = settings.get_type("article").unwrap();
        assert_eq!(article.relations[0].kind, RelationKind::BelongsTo);
        assert_eq!(article.relations[0].local_key, "created_by");
    }

    #[test]
    fn test_filter_without_value_is_rejected() {
        let filter = FilterConfig {
            column: "id".to_string(),
            op: FilterOp::Gt,
            value: serde_json::Value::Null,
        };
        assert!(filter.to_condition().is_err());
    }
}
