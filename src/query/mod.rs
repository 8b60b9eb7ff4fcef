//! Query sanitizing module
//!
//! Normalizes raw user input into a term string that is safe to hand to a
//! fulltext backend. In boolean mode with operators allowed:
//! - Required terms: `+rust`
//! - Excluded terms: `-java`
//! - Prefix terms: `sear*`
//!
//! Repeated operators are collapsed, dangling operators are dropped and
//! characters with special meaning to the backend (`~ @ " < > ( )`) are
//! removed. Without operators every special character is removed.

use crate::config::SearchSettings;
use crate::search::SearchError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static MINUS_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());
static PLUS_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\++").unwrap());
static STAR_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*+").unwrap());
static INVALID_OPERATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:[-+*][-+*]+)|(?:[-+]\s)|[~@"<>()]"#).unwrap());
static SPECIAL_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[+\-"<>()~*@]"#).unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// How the backend should interpret the search term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Operator-aware matching (`+`, `-`, `*`)
    Boolean,
    /// Statistical relevance, optionally broadened by query expansion
    NaturalLanguage { query_expansion: bool },
}

impl MatchMode {
    /// Derive the match mode from search settings.
    ///
    /// Query expansion only applies to natural language mode.
    pub fn from_settings(settings: &SearchSettings) -> Self {
        if settings.boolean_mode {
            Self::Boolean
        } else {
            Self::NaturalLanguage {
                query_expansion: settings.query_expansion,
            }
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Self::Boolean)
    }

    /// SQL-style modifier, mostly useful for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "IN BOOLEAN MODE",
            Self::NaturalLanguage {
                query_expansion: true,
            } => "IN NATURAL LANGUAGE MODE WITH QUERY EXPANSION",
            Self::NaturalLanguage {
                query_expansion: false,
            } => "IN NATURAL LANGUAGE MODE",
        }
    }
}

impl Default for MatchMode {
    fn default() -> Self {
        Self::Boolean
    }
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Wildcard markers added around the sanitized term before it reaches the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WildcardWrap {
    /// Pass the term through unchanged
    None,
    /// `*term*`
    #[default]
    BothSides,
    /// `term*`
    SuffixOnly,
}

/// Turns raw user input into a backend-safe search term
#[derive(Debug, Clone)]
pub struct QuerySanitizer {
    boolean_mode: bool,
    allow_operators: bool,
    wildcard: WildcardWrap,
    min_length: usize,
}

impl Default for QuerySanitizer {
    fn default() -> Self {
        Self::new(&SearchSettings::default())
    }
}

impl QuerySanitizer {
    pub fn new(settings: &SearchSettings) -> Self {
        Self {
            boolean_mode: settings.boolean_mode,
            allow_operators: settings.allow_operators,
            wildcard: settings.wildcard,
            min_length: settings.min_query_length,
        }
    }

    /// Operators survive sanitizing only in boolean mode
    pub fn operators_enabled(&self) -> bool {
        self.boolean_mode && self.allow_operators
    }

    /// Clean a raw query string.
    ///
    /// The result is stable: sanitizing it again yields the same string.
    pub fn sanitize(&self, raw: &str) -> String {
        let mut query = if self.operators_enabled() {
            let collapsed = MINUS_RUN.replace_all(raw, "-");
            let collapsed = PLUS_RUN.replace_all(&collapsed, "+");
            let mut query = STAR_RUN.replace_all(&collapsed, "*").into_owned();

            // Removing one operator can expose another dangling one
            loop {
                let next = INVALID_OPERATORS.replace_all(&query, " ").into_owned();
                if next == query {
                    break query;
                }
                query = next;
            }
        } else {
            SPECIAL_CHARS.replace_all(raw, " ").into_owned()
        };

        query = WHITESPACE.replace_all(&query, " ").into_owned();

        query
            .trim_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '-' | '+'))
            .to_string()
    }

    /// Apply the wildcard policy to an already sanitized term
    pub fn match_term(&self, sanitized: &str) -> String {
        match self.wildcard {
            WildcardWrap::None => sanitized.to_string(),
            WildcardWrap::BothSides => format!("*{}*", sanitized),
            WildcardWrap::SuffixOnly => format!("{}*", sanitized),
        }
    }

    /// Sanitize and enforce the minimum length.
    ///
    /// Length is counted in characters, not bytes.
    pub fn prepare(&self, raw: &str) -> Result<String, SearchError> {
        let sanitized = self.sanitize(raw);
        let length = sanitized.chars().count();

        if length < self.min_length {
            return Err(SearchError::QueryTooShort {
                min: self.min_length,
                actual: length,
            });
        }

        Ok(sanitized)
    }
}
