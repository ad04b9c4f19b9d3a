//! Helpers for building batch queries over lists of IRIs.

use std::fmt;

use crate::error::{FetchError, Result};
use crate::query::{Operation, Query};

/// Placeholder replaced by a `VALUES` clause in a [`QueryTemplate`].
pub const VALUES_PLACEHOLDER: &str = "{{VALUES}}";

/// An absolute IRI that can be written between `<` and `>` in a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Iri(String);

impl Iri {
    /// Validate and wrap an IRI.
    ///
    /// Only checks what matters for safe interpolation: a scheme is present
    /// and no character that would end or corrupt an IRIREF occurs.
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();

        let Some((scheme, rest)) = value.split_once(':') else {
            return Err(FetchError::InvalidIri(format!("'{}' has no scheme", value)));
        };
        let scheme_ok = scheme
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !scheme_ok || rest.is_empty() {
            return Err(FetchError::InvalidIri(format!("'{}' is not absolute", value)));
        }

        if let Some(bad) = value
            .chars()
            .find(|c| c.is_whitespace() || c.is_control() || "<>\"{}|^`\\".contains(*c))
        {
            return Err(FetchError::InvalidIri(format!(
                "'{}' contains forbidden character {:?}",
                value, bad
            )));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

impl std::str::FromStr for Iri {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        Iri::parse(s)
    }
}

impl AsRef<str> for Iri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Render `VALUES ?var { <a> <b> ... }`.
pub fn values_clause(var: &str, iris: &[Iri]) -> String {
    let var = var.trim_start_matches(['?', '$']);
    let mut clause = format!("VALUES ?{} {{", var);
    for iri in iris {
        clause.push(' ');
        clause.push_str(&iri.to_string());
    }
    clause.push_str(" }");
    clause
}

/// Query text with a `{{VALUES}}` slot filled per batch.
///
/// ```
/// use cubefetch_client::{Iri, QueryTemplate};
///
/// let template = QueryTemplate::new(
///     "SELECT ?cube ?label WHERE { {{VALUES}} ?cube <http://schema.org/name> ?label }",
///     "cube",
/// ).unwrap();
/// let iri = Iri::parse("https://example.org/cube/1").unwrap();
/// let query = template.render(&[iri]);
/// assert!(query.text().contains("VALUES ?cube { <https://example.org/cube/1> }"));
/// ```
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    text: String,
    var: String,
    operation: Operation,
}

impl QueryTemplate {
    /// Create a template binding identifiers to `var`.
    pub fn new(text: impl Into<String>, var: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if !text.contains(VALUES_PLACEHOLDER) {
            return Err(FetchError::InvalidConfig(format!(
                "query template has no {} placeholder",
                VALUES_PLACEHOLDER
            )));
        }
        let var = var.into();
        let bare = var.trim_start_matches(['?', '$']);
        if bare.is_empty() || !bare.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(FetchError::InvalidConfig(format!(
                "'{}' is not a valid variable name",
                var
            )));
        }
        Ok(Self {
            text,
            var: bare.to_string(),
            operation: Operation::default(),
        })
    }

    /// Send rendered queries with `operation`.
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    /// Variable the identifiers are bound to.
    pub fn var(&self) -> &str {
        &self.var
    }

    /// Build the query for one batch.
    pub fn render(&self, iris: &[Iri]) -> Query {
        let text = self
            .text
            .replace(VALUES_PLACEHOLDER, &values_clause(&self.var, iris));
        Query::new(text).with_operation(self.operation)
    }
}
