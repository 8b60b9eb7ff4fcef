//! Builds the backend query for each participating type

use super::error::SearchError;
use super::options::SearchOptions;
use crate::backend::{RelationLoad, TextMatchQuery};
use crate::models::{QueryContext, SearchableType};
use crate::query::MatchMode;

/// Per-call query construction
pub struct QueryBuilder<'a> {
    term: &'a str,
    mode: MatchMode,
    per_page: u64,
    page: u64,
    participating: usize,
    options: &'a SearchOptions,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(
        term: &'a str,
        mode: MatchMode,
        per_page: u64,
        page: u64,
        participating: usize,
        options: &'a SearchOptions,
    ) -> Self {
        Self {
            term,
            mode,
            per_page,
            page,
            participating,
            options,
        }
    }

    /// Rows fetched per type when several types are merged.
    ///
    /// Grows with the page number, so deep pages fetch a lot.
    pub fn candidate_cap(&self) -> u64 {
        self.per_page
            .saturating_mul(self.participating as u64)
            .saturating_mul(self.page)
    }

    /// Build the query for one type. `None` leaves the type out.
    pub fn build<R>(&self, searchable: &SearchableType<R>) -> Result<Option<TextMatchQuery>, SearchError> {
        if let Some(custom) = searchable.custom_query() {
            let ctx = QueryContext {
                collection: searchable.collection(),
                fields: searchable.fields(),
                term: self.term,
                mode: self.mode,
                per_page: self.per_page,
                page: self.page,
                participating: self.participating,
            };
            return Ok(custom(&ctx));
        }

        let mut query = TextMatchQuery::new(
            searchable.collection(),
            searchable.fields().to_vec(),
            self.term,
            self.mode,
        );

        if let Some(eager) = self.options.eager_load_for(searchable.name()) {
            for (name, constraint) in eager.entries() {
                let relation = searchable.relation(name).ok_or_else(|| {
                    SearchError::UnknownRelation {
                        type_name: searchable.name().to_string(),
                        relation: name.to_string(),
                    }
                })?;

                let load = RelationLoad::new(relation.clone());
                query = query.with_relation(match constraint {
                    Some(constraint) => constraint(load),
                    None => load,
                });
            }
        }

        if !self.options.bypasses(searchable.name()) {
            if let Some(filter) = searchable.filter() {
                match filter(query) {
                    Some(filtered) => query = filtered,
                    None => return Ok(None),
                }
            }
        }

        if let Some(filter) = self.options.filter() {
            match filter(query) {
                Some(filtered) => query = filtered,
                None => return Ok(None),
            }
        }

        if self.participating > 1 {
            query.limit = Some(self.candidate_cap());
        }

        Ok(Some(query))
    }
}
