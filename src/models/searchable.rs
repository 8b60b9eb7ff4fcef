//! Searchable type definitions

use crate::backend::{Relation, Row, TextMatchQuery};
use crate::query::MatchMode;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

/// Adjusts a type's query. Returning `None` leaves the type out of the search.
pub type QueryFilter = Arc<dyn Fn(TextMatchQuery) -> Option<TextMatchQuery> + Send + Sync>;

/// Replaces the default query of a type entirely
pub type CustomQuery = Arc<dyn Fn(&QueryContext<'_>) -> Option<TextMatchQuery> + Send + Sync>;

/// Turns a backend row into the caller's record type
pub type Decoder<R> = Arc<dyn Fn(&Row) -> Result<R, serde_json::Error> + Send + Sync>;

/// What a custom query gets to work with
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    pub collection: &'a str,
    pub fields: &'a [String],
    /// Sanitized term with the wildcard policy applied
    pub term: &'a str,
    pub mode: MatchMode,
    pub per_page: u64,
    pub page: u64,
    /// Number of types taking part in this search
    pub participating: usize,
}

impl QueryContext<'_> {
    /// The query the type would run without customization
    pub fn base_query(&self) -> TextMatchQuery {
        TextMatchQuery::new(self.collection, self.fields.to_vec(), self.term, self.mode)
    }
}

/// A record type taking part in cross-type search
pub struct SearchableType<R> {
    name: String,
    collection: String,
    fields: Vec<String>,
    relations: Vec<Relation>,
    custom_query: Option<CustomQuery>,
    filter: Option<QueryFilter>,
    decoder: Decoder<R>,
}

impl<R> SearchableType<R> {
    pub fn new<F>(
        name: impl Into<String>,
        collection: impl Into<String>,
        fields: Vec<String>,
        decoder: F,
    ) -> Self
    where
        F: Fn(&Row) -> Result<R, serde_json::Error> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            collection: collection.into(),
            fields,
            relations: Vec::new(),
            custom_query: None,
            filter: None,
            decoder: Arc::new(decoder),
        }
    }

    /// Declare an association that can be eager loaded
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    /// Predefined filter applied on every search unless bypassed
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(TextMatchQuery) -> Option<TextMatchQuery> + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Take over query construction for this type
    pub fn with_custom_query<F>(mut self, custom: F) -> Self
    where
        F: Fn(&QueryContext<'_>) -> Option<TextMatchQuery> + Send + Sync + 'static,
    {
        self.custom_query = Some(Arc::new(custom));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Look up a declared relation by name
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn filter(&self) -> Option<&QueryFilter> {
        self.filter.as_ref()
    }

    pub fn custom_query(&self) -> Option<&CustomQuery> {
        self.custom_query.as_ref()
    }

    pub fn decode(&self, row: &Row) -> Result<R, serde_json::Error> {
        (self.decoder)(row)
    }
}

impl<R: DeserializeOwned + 'static> SearchableType<R> {
    /// A type whose rows deserialize straight into `R`
    pub fn deserialized(
        name: impl Into<String>,
        collection: impl Into<String>,
        fields: Vec<String>,
    ) -> Self {
        Self::new(name, collection, fields, |row: &Row| row.decode::<R>())
    }
}

impl<R> fmt::Debug for SearchableType<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchableType")
            .field("name", &self.name)
            .field("collection", &self.collection)
            .field("fields", &self.fields)
            .field("relations", &self.relations)
            .field("custom_query", &self.custom_query.is_some())
            .field("filter", &self.filter.is_some())
            .finish()
    }
}
