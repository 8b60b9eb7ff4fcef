//! Backend traits and query types

use crate::query::MatchMode;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;

/// A row as a map of column name to JSON value
pub type Record = Map<String, Value>;

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Comparison operator of a column predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }

    /// Evaluate against an ordering of `left` relative to `right`
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::NotEq => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Gte => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
        }
    }
}

/// A predicate restricting which rows match
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        column: String,
        op: Comparison,
        value: Value,
    },
    IsNull(String),
    NotNull(String),
}

impl Condition {
    /// Evaluate in memory with SQL semantics: comparisons involving NULL are false
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::IsNull(column) => record.get(column).map_or(true, Value::is_null),
            Self::NotNull(column) => record.get(column).map_or(false, |v| !v.is_null()),
            Self::Compare { column, op, value } => record
                .get(column)
                .and_then(|left| compare_values(left, value))
                .map_or(false, |ordering| op.holds(ordering)),
        }
    }
}

/// Order two scalar JSON values. Mismatched types and NULLs are incomparable.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Predicate builders shared by anything carrying a condition list
pub trait Constrained: Sized {
    fn conditions_mut(&mut self) -> &mut Vec<Condition>;

    fn where_cmp(mut self, column: impl Into<String>, op: Comparison, value: impl Into<Value>) -> Self {
        self.conditions_mut().push(Condition::Compare {
            column: column.into(),
            op,
            value: value.into(),
        });
        self
    }

    fn where_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_cmp(column, Comparison::Eq, value)
    }

    fn where_not_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_cmp(column, Comparison::NotEq, value)
    }

    fn where_gt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_cmp(column, Comparison::Gt, value)
    }

    fn where_lt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_cmp(column, Comparison::Lt, value)
    }

    fn where_null(mut self, column: impl Into<String>) -> Self {
        self.conditions_mut().push(Condition::IsNull(column.into()));
        self
    }

    fn where_not_null(mut self, column: impl Into<String>) -> Self {
        self.conditions_mut().push(Condition::NotNull(column.into()));
        self
    }
}

/// How a related record is found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Parent `local_key` points at related `foreign_key`; at most one record
    BelongsTo,
    /// Related `foreign_key` points back at parent `local_key`
    HasMany,
}

/// A named association declared by a searchable type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    pub collection: String,
    pub kind: RelationKind,
    pub local_key: String,
    pub foreign_key: String,
}

impl Relation {
    pub fn belongs_to(
        name: impl Into<String>,
        collection: impl Into<String>,
        local_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
            kind: RelationKind::BelongsTo,
            local_key: local_key.into(),
            foreign_key: foreign_key.into(),
        }
    }

    pub fn has_many(
        name: impl Into<String>,
        collection: impl Into<String>,
        local_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
            kind: RelationKind::HasMany,
            local_key: local_key.into(),
            foreign_key: foreign_key.into(),
        }
    }

    /// Pick the candidates linked to `parent`. A NULL key links nothing.
    pub fn link(&self, parent: &Record, candidates: &[Record]) -> Related {
        let key = parent.get(&self.local_key).filter(|v| !v.is_null());
        let linked = |candidate: &&Record| {
            key.map_or(false, |key| {
                candidate
                    .get(&self.foreign_key)
                    .and_then(|fk| compare_values(fk, key))
                    == Some(Ordering::Equal)
            })
        };

        match self.kind {
            RelationKind::BelongsTo => Related::One(candidates.iter().find(linked).cloned()),
            RelationKind::HasMany => {
                Related::Many(candidates.iter().filter(linked).cloned().collect())
            }
        }
    }
}

/// An association to load alongside matched rows
#[derive(Debug, Clone, PartialEq)]
pub struct RelationLoad {
    pub relation: Relation,
    pub conditions: Vec<Condition>,
}

impl RelationLoad {
    pub fn new(relation: Relation) -> Self {
        Self {
            relation,
            conditions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.relation.name
    }

    /// Whether a related record passes the load constraints
    pub fn accepts(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }
}

impl Constrained for RelationLoad {
    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.conditions
    }
}

/// A fulltext query against one collection, ordered by score descending
#[derive(Debug, Clone, PartialEq)]
pub struct TextMatchQuery {
    pub collection: String,
    pub fields: Vec<String>,
    pub term: String,
    pub mode: MatchMode,
    pub conditions: Vec<Condition>,
    pub relations: Vec<RelationLoad>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl TextMatchQuery {
    pub fn new(
        collection: impl Into<String>,
        fields: Vec<String>,
        term: impl Into<String>,
        mode: MatchMode,
    ) -> Self {
        Self {
            collection: collection.into(),
            fields,
            term: term.into(),
            mode,
            conditions: Vec::new(),
            relations: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn with_relation(mut self, load: RelationLoad) -> Self {
        self.relations.push(load);
        self
    }

    pub fn take(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Restrict to one page. Pages are 1-indexed.
    pub fn paginate(self, per_page: u64, page: u64) -> Self {
        let offset = page.saturating_sub(1).saturating_mul(per_page);
        self.take(per_page).skip(offset)
    }
}

impl Constrained for TextMatchQuery {
    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.conditions
    }
}

/// Related records attached to a row
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    One(Option<Record>),
    Many(Vec<Record>),
}

impl Related {
    fn into_value(self) -> Value {
        match self {
            Self::One(record) => record.map(Value::Object).unwrap_or(Value::Null),
            Self::Many(records) => Value::Array(records.into_iter().map(Value::Object).collect()),
        }
    }
}

/// A matched row with its relevance score
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub score: f64,
    pub columns: Record,
    pub relations: BTreeMap<String, Related>,
}

impl Row {
    pub fn new(columns: Record, score: f64) -> Self {
        Self {
            score,
            columns,
            relations: BTreeMap::new(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn relation(&self, name: &str) -> Option<&Related> {
        self.relations.get(name)
    }

    pub fn relation_names(&self) -> Vec<String> {
        self.relations.keys().cloned().collect()
    }

    /// Columns plus loaded relations as one JSON object.
    ///
    /// `score` is added unless a column already uses that name.
    pub fn to_value(&self) -> Value {
        let mut object = self.columns.clone();
        for (name, related) in &self.relations {
            object.insert(name.clone(), related.clone().into_value());
        }
        if !object.contains_key("score") {
            if let Some(score) = serde_json::Number::from_f64(self.score) {
                object.insert("score".to_string(), Value::Number(score));
            }
        }
        Value::Object(object)
    }

    /// Deserialize the row into a typed record
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_value())
    }
}

/// Rows returned for a query, plus the count of all matches ignoring limit/offset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchSet {
    pub rows: Vec<Row>,
    pub total: u64,
}

impl MatchSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A storage backend able to run fulltext queries
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend name, used in logs
    fn name(&self) -> &str;

    /// Run the query. `total` must ignore `limit` and `offset`.
    async fn execute(&self, query: &TextMatchQuery) -> Result<MatchSet, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_condition_null_semantics() {
        let row = record(json!({"id": 2, "published_at": null}));

        assert!(Condition::IsNull("published_at".into()).matches(&row));
        assert!(Condition::IsNull("missing".into()).matches(&row));
        assert!(Condition::NotNull("id".into()).matches(&row));

        let cmp = Condition::Compare {
            column: "published_at".into(),
            op: Comparison::NotEq,
            value: json!("2020-01-01"),
        };
        assert!(!cmp.matches(&row));
    }

    #[test]
    fn test_condition_comparisons() {
        let row = record(json!({"id": 2, "title": "Modi minus.", "ratio": 1.5}));
        let check = |column: &str, op, value| {
            Condition::Compare {
                column: column.into(),
                op,
                value,
            }
            .matches(&row)
        };

        assert!(check("id", Comparison::Gt, json!(1)));
        assert!(check("id", Comparison::Eq, json!(2.0)));
        assert!(!check("id", Comparison::Lt, json!(2)));
        assert!(check("ratio", Comparison::Lte, json!(1.5)));
        assert!(check("title", Comparison::Gte, json!("Modi")));
        // Mismatched types never match
        assert!(!check("id", Comparison::Eq, json!("2")));
    }

    #[test]
    fn test_paginate_sets_limit_and_offset() {
        let query = TextMatchQuery::new("posts", vec!["title".into()], "*rust*", MatchMode::Boolean)
            .paginate(10, 3);
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(20));
    }

    #[test]
    fn test_constrained_builders() {
        let relation = Relation::belongs_to("author", "users", "created_by", "id");
        let load = RelationLoad::new(relation).where_gt("id", 1).where_not_null("name");

        assert_eq!(load.conditions.len(), 2);
        assert!(load.accepts(&record(json!({"id": 2, "name": "Ann"}))));
        assert!(!load.accepts(&record(json!({"id": 1, "name": "Bob"}))));
    }

    #[test]
    fn test_row_decode_merges_relations() {
        #[derive(Deserialize)]
        struct User {
            name: String,
        }

        #[derive(Deserialize)]
        struct Article {
            title: String,
            author: Option<User>,
            score: f64,
        }

        let mut row = Row::new(record(json!({"id": 1, "title": "Modi minus."})), 2.0);
        row.relations.insert(
            "author".into(),
            Related::One(Some(record(json!({"id": 3, "name": "Ann"})))),
        );

        let article: Article = row.decode().unwrap();
        assert_eq!(article.title, "Modi minus.");
        assert_eq!(article.author.unwrap().name, "Ann");
        assert_eq!(article.score, 2.0);
        assert_eq!(row.relation_names(), vec!["author".to_string()]);
    }
}
