//! Match term parsing shared by the backends

use crate::query::MatchMode;

/// A single search token, lowercased
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// Matches any word starting with `text`
    pub prefix: bool,
}

impl Token {
    fn new(text: impl Into<String>, prefix: bool) -> Self {
        Self {
            text: text.into(),
            prefix,
        }
    }

    /// Whether a lowercased word satisfies this token
    pub fn matches(&self, word: &str) -> bool {
        if self.prefix {
            word.starts_with(&self.text)
        } else {
            word == self.text
        }
    }
}

/// A match term split by role
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchExpression {
    pub required: Vec<Token>,
    pub optional: Vec<Token>,
    pub excluded: Vec<Token>,
}

#[derive(Clone, Copy)]
enum Role {
    Required,
    Optional,
    Excluded,
}

impl MatchExpression {
    /// Parse a match term.
    ///
    /// In boolean mode `+word` is required, `-word` is excluded and a trailing
    /// `*` marks a prefix. Leading `*` is dropped. In natural language mode
    /// every word is optional and operators carry no meaning.
    pub fn parse(term: &str, mode: MatchMode) -> Self {
        let mut expression = Self::default();

        for word in term.split_whitespace() {
            let (role, body) = if mode.is_boolean() {
                let body = word.trim_start_matches('*');
                match body.chars().next() {
                    Some('+') => (Role::Required, &body[1..]),
                    Some('-') => (Role::Excluded, &body[1..]),
                    _ => (Role::Optional, body),
                }
            } else {
                (Role::Optional, word)
            };

            let prefix = mode.is_boolean() && body.ends_with('*');
            let pieces = words(body);
            let last = pieces.len().saturating_sub(1);

            for (i, piece) in pieces.into_iter().enumerate() {
                let token = Token::new(piece, prefix && i == last);
                match role {
                    Role::Required => expression.required.push(token),
                    Role::Optional => expression.optional.push(token),
                    Role::Excluded => expression.excluded.push(token),
                }
            }
        }

        expression
    }

    /// Tokens that can make a row match
    pub fn positive(&self) -> impl Iterator<Item = &Token> {
        self.required.iter().chain(self.optional.iter())
    }

    /// Nothing can match without a required or optional token
    pub fn is_unmatchable(&self) -> bool {
        self.required.is_empty() && self.optional.is_empty()
    }
}

/// Split text into lowercased alphanumeric words
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}
