//! SQLite backend using FTS5 external-content tables
//!
//! A collection `articles` is searched through a companion `articles_fts`
//! virtual table indexing the searchable fields with `content='articles'`.
//! [`SqliteBackend::ensure_fts_index`] creates the table and its sync triggers.

use super::term::{MatchExpression, Token};
use super::traits::*;
use crate::config::DatabaseSettings;
use crate::query::MatchMode;
use async_trait::async_trait;
use serde_json::{Number, Value};
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column, Row as _, Sqlite, TypeInfo, ValueRef};
use std::str::FromStr;
use tracing::{debug, info};

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Fulltext backend over a SQLite connection pool
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Create a backend over an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool from database settings
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, BackendError> {
        let options = SqliteConnectOptions::from_str(&settings.url)?
            .create_if_missing(settings.create_if_missing);

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .connect_with(options)
            .await?;

        info!("Connected to {}", settings.url);
        Ok(Self::new(pool))
    }

    /// Get a reference to the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create `<collection>_fts` with sync triggers and index existing rows.
    ///
    /// Returns `false` when the index already exists.
    pub async fn ensure_fts_index(
        &self,
        collection: &str,
        fields: &[String],
    ) -> Result<bool, BackendError> {
        if fields.is_empty() {
            return Err(BackendError::InvalidQuery(format!(
                "No fields to index for {}",
                collection
            )));
        }

        let fts_name = format!("{}_fts", collection);
        let existing: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(&fts_name)
                .fetch_optional(&self.pool)
                .await?;
        if existing.is_some() {
            return Ok(false);
        }

        let table = quote_ident(collection);
        let fts = quote_ident(&fts_name);
        let columns = fields.iter().map(|f| quote_ident(f)).collect::<Vec<_>>().join(", ");
        let new_values = prefixed(fields, "NEW");
        let old_values = prefixed(fields, "OLD");
        let trigger = |suffix: &str| quote_ident(&format!("{}_{}", fts_name, suffix));

        let sql = format!(
            r#"
            CREATE VIRTUAL TABLE {fts} USING fts5(
                {columns},
                content={content},
                content_rowid='rowid'
            );

            CREATE TRIGGER {ai} AFTER INSERT ON {table} BEGIN
                INSERT INTO {fts}(rowid, {columns}) VALUES (NEW.rowid, {new_values});
            END;

            CREATE TRIGGER {ad} AFTER DELETE ON {table} BEGIN
                INSERT INTO {fts}({fts}, rowid, {columns}) VALUES ('delete', OLD.rowid, {old_values});
            END;

            CREATE TRIGGER {au} AFTER UPDATE ON {table} BEGIN
                INSERT INTO {fts}({fts}, rowid, {columns}) VALUES ('delete', OLD.rowid, {old_values});
                INSERT INTO {fts}(rowid, {columns}) VALUES (NEW.rowid, {new_values});
            END;

            INSERT INTO {fts}({fts}) VALUES ('rebuild');
            "#,
            content = quote_literal(collection),
            ai = trigger("ai"),
            ad = trigger("ad"),
            au = trigger("au"),
        );

        sqlx::raw_sql(&sql).execute(&self.pool).await?;
        info!("Created fulltext index {}", fts_name);
        Ok(true)
    }

    async fn load_relation(&self, load: &RelationLoad, rows: &mut [Row]) -> Result<(), BackendError> {
        let relation = &load.relation;

        let mut keys: Vec<Value> = Vec::new();
        for row in rows.iter() {
            if let Some(key) = row.get(&relation.local_key).filter(|v| !v.is_null()) {
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            }
        }

        let candidates = if keys.is_empty() {
            Vec::new()
        } else {
            let keys = keys.iter().map(bind_value).collect::<Result<Vec<_>, _>>()?;
            let (predicates, values) = where_clause("r", &load.conditions)?;
            let sql = format!(
                "SELECT r.* FROM {} AS r WHERE r.{} IN ({}){} ORDER BY r.rowid",
                quote_ident(&relation.collection),
                quote_ident(&relation.foreign_key),
                vec!["?"; keys.len()].join(", "),
                predicates
            );

            let query = bind_all(sqlx::query(&sql), &keys);
            bind_all(query, &values)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| missing_table(e, &relation.collection))?
                .iter()
                .map(decode_record)
                .collect::<Result<Vec<_>, _>>()?
        };

        for row in rows.iter_mut() {
            let related = relation.link(&row.columns, &candidates);
            row.relations.insert(load.name().to_string(), related);
        }

        Ok(())
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn execute(&self, query: &TextMatchQuery) -> Result<MatchSet, BackendError> {
        let expression = MatchExpression::parse(&query.term, query.mode);
        let Some(match_expr) = fts5_expression(&query.fields, &expression) else {
            debug!("Term '{}' has nothing to match", query.term);
            return Ok(MatchSet::empty());
        };

        if let MatchMode::NaturalLanguage {
            query_expansion: true,
        } = query.mode
        {
            debug!("FTS5 has no query expansion, matching any word instead");
        }

        let table = quote_ident(&query.collection);
        let fts = quote_ident(&format!("{}_fts", query.collection));
        let (predicates, values) = where_clause("c", &query.conditions)?;

        let from = format!(
            "FROM {fts} JOIN {table} AS c ON c.rowid = {fts}.rowid WHERE {fts} MATCH ?{predicates}"
        );
        let count_sql = format!("SELECT COUNT(*) {}", from);
        let select_sql = format!(
            "SELECT c.*, -bm25({}) AS score {} ORDER BY score DESC, c.rowid ASC LIMIT ? OFFSET ?",
            fts, from
        );

        debug!("FTS5 match on {}: {}", query.collection, match_expr);

        let total: i64 = bind_all(sqlx::query(&count_sql).bind(match_expr.as_str()), &values)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| missing_table(e, &query.collection))?
            .try_get(0)?;

        let limit = query.limit.map_or(-1, to_sql_int);
        let offset = query.offset.map_or(0, to_sql_int);

        let mut rows = bind_all(sqlx::query(&select_sql).bind(match_expr.as_str()), &values)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| missing_table(e, &query.collection))?
            .iter()
            .map(|row| -> Result<Row, BackendError> {
                let mut columns = decode_record(row)?;
                let score = columns.remove("score").and_then(|v| v.as_f64()).unwrap_or(0.0);
                Ok(Row::new(columns, score))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for load in &query.relations {
            self.load_relation(load, &mut rows).await?;
        }

        Ok(MatchSet {
            rows,
            total: total.max(0) as u64,
        })
    }
}

/// Translate a parsed term into an FTS5 expression restricted to `fields`.
///
/// Required tokens are AND-ed; without any, optional tokens are OR-ed.
/// Exclusions are appended with `NOT`. Returns `None` when nothing can match.
pub fn fts5_expression(fields: &[String], expression: &MatchExpression) -> Option<String> {
    if expression.is_unmatchable() {
        return None;
    }

    let positive = if expression.required.is_empty() {
        join_tokens(&expression.optional, " OR ")
    } else {
        join_tokens(&expression.required, " AND ")
    };

    let mut expr = format!("({})", positive);
    for token in &expression.excluded {
        expr.push_str(" NOT ");
        expr.push_str(&fts5_token(token));
    }

    if fields.is_empty() {
        return Some(expr);
    }

    let columns = fields.iter().map(|f| fts5_column(f)).collect::<Vec<_>>().join(" ");
    Some(format!("{{{}}} : ({})", columns, expr))
}

fn join_tokens(tokens: &[Token], separator: &str) -> String {
    tokens.iter().map(fts5_token).collect::<Vec<_>>().join(separator)
}

fn fts5_token(token: &Token) -> String {
    let quoted = format!("\"{}\"", token.text.replace('"', "\"\""));
    if token.prefix {
        quoted + "*"
    } else {
        quoted
    }
}

fn fts5_column(name: &str) -> String {
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn prefixed(fields: &[String], row: &str) -> String {
    fields
        .iter()
        .map(|f| format!("{}.{}", row, quote_ident(f)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// A value bound to a `?` placeholder
#[derive(Debug, Clone)]
enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
}

fn bind_value(value: &Value) -> Result<SqlValue, BackendError> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(SqlValue::Integer(i)),
            None => n
                .as_f64()
                .map(SqlValue::Real)
                .ok_or_else(|| BackendError::InvalidQuery(format!("Unsupported number {}", n))),
        },
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        other => Err(BackendError::InvalidQuery(format!(
            "Cannot compare against {}",
            other
        ))),
    }
}

/// Render conditions as ` AND ...` predicates on `alias`, with their bound values
fn where_clause(
    alias: &str,
    conditions: &[Condition],
) -> Result<(String, Vec<SqlValue>), BackendError> {
    let mut sql = String::new();
    let mut values = Vec::new();

    for condition in conditions {
        match condition {
            Condition::IsNull(column) => {
                sql.push_str(&format!(" AND {}.{} IS NULL", alias, quote_ident(column)));
            }
            Condition::NotNull(column) => {
                sql.push_str(&format!(" AND {}.{} IS NOT NULL", alias, quote_ident(column)));
            }
            Condition::Compare { column, op, value } => {
                sql.push_str(&format!(
                    " AND {}.{} {} ?",
                    alias,
                    quote_ident(column),
                    op.as_sql()
                ));
                values.push(bind_value(value)?);
            }
        }
    }

    Ok((sql, values))
}

fn bind_all<'q>(mut query: SqliteQuery<'q>, values: &'q [SqlValue]) -> SqliteQuery<'q> {
    for value in values {
        query = match value {
            SqlValue::Null => query.bind(None::<i64>),
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Real(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
            SqlValue::Bool(v) => query.bind(*v),
        };
    }
    query
}

/// Map every column of a row to JSON by its runtime storage class
fn decode_record(row: &SqliteRow) -> Result<Record, BackendError> {
    let mut record = Record::new();

    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index)?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(index)?),
                "REAL" => Number::from_f64(row.try_get::<f64, _>(index)?)
                    .map_or(Value::Null, Value::Number),
                "BLOB" => Value::from(row.try_get::<Vec<u8>, _>(index)?),
                _ => Value::String(row.try_get::<String, _>(index)?),
            }
        };

        record.insert(column.name().to_string(), value);
    }

    Ok(record)
}

fn missing_table(err: sqlx::Error, collection: &str) -> BackendError {
    if let sqlx::Error::Database(db) = &err {
        if db.message().contains("no such table") {
            return BackendError::UnknownCollection(collection.to_string());
        }
    }
    BackendError::Database(err)
}
