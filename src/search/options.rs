//! Per-call search options

use crate::backend::{RelationLoad, TextMatchQuery};
use crate::models::QueryFilter;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Narrows an eager-loaded relation
pub type RelationConstraint = Arc<dyn Fn(RelationLoad) -> RelationLoad + Send + Sync>;

/// Which predefined type filters to skip
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FilterBypass {
    #[default]
    None,
    All,
    Only(HashSet<String>),
}

impl FilterBypass {
    pub fn covers(&self, type_name: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Only(names) => names.contains(type_name),
        }
    }
}

/// Relations to load for one type
#[derive(Clone, Default)]
pub struct EagerLoad {
    entries: Vec<(String, Option<RelationConstraint>)>,
}

impl EagerLoad {
    /// Load a relation as is
    pub fn relation(name: impl Into<String>) -> Self {
        Self::default().and(name)
    }

    /// Load a relation narrowed by `constraint`
    pub fn constrained<F>(name: impl Into<String>, constraint: F) -> Self
    where
        F: Fn(RelationLoad) -> RelationLoad + Send + Sync + 'static,
    {
        Self::default().and_constrained(name, constraint)
    }

    /// Load several relations as is
    pub fn relations<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().fold(Self::default(), |load, name| load.and(name))
    }

    pub fn and(mut self, name: impl Into<String>) -> Self {
        self.entries.push((name.into(), None));
        self
    }

    pub fn and_constrained<F>(mut self, name: impl Into<String>, constraint: F) -> Self
    where
        F: Fn(RelationLoad) -> RelationLoad + Send + Sync + 'static,
    {
        self.entries.push((name.into(), Some(Arc::new(constraint))));
        self
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<&RelationConstraint>)> {
        self.entries
            .iter()
            .map(|(name, constraint)| (name.as_str(), constraint.as_ref()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for EagerLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(name, constraint)| {
                if constraint.is_some() {
                    format!("{} (constrained)", name)
                } else {
                    name.clone()
                }
            }))
            .finish()
    }
}

/// Options for a single search call
#[derive(Clone, Default)]
pub struct SearchOptions {
    filter: Option<QueryFilter>,
    bypass: FilterBypass,
    eager_loads: HashMap<String, EagerLoad>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ad-hoc filter applied to every type after its predefined filter
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(TextMatchQuery) -> Option<TextMatchQuery> + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Skip every predefined type filter
    pub fn without_filters(mut self) -> Self {
        self.bypass = FilterBypass::All;
        self
    }

    /// Skip the predefined filters of the named types
    pub fn without_filters_for<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bypass = match self.bypass {
            FilterBypass::All => FilterBypass::All,
            FilterBypass::None => {
                FilterBypass::Only(names.into_iter().map(Into::<String>::into).collect())
            }
            FilterBypass::Only(mut set) => {
                set.extend(names.into_iter().map(Into::<String>::into));
                FilterBypass::Only(set)
            }
        };
        self
    }

    /// Eager load relations for the named type
    pub fn with_eager_load(mut self, type_name: impl Into<String>, load: EagerLoad) -> Self {
        self.eager_loads.insert(type_name.into(), load);
        self
    }

    pub fn filter(&self) -> Option<&QueryFilter> {
        self.filter.as_ref()
    }

    pub fn bypass(&self) -> &FilterBypass {
        &self.bypass
    }

    pub fn bypasses(&self, type_name: &str) -> bool {
        self.bypass.covers(type_name)
    }

    pub fn eager_load_for(&self, type_name: &str) -> Option<&EagerLoad> {
        self.eager_loads.get(type_name)
    }
}

impl fmt::Debug for SearchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchOptions")
            .field("filter", &self.filter.is_some())
            .field("bypass", &self.bypass)
            .field("eager_loads", &self.eager_loads)
            .finish()
    }
}
