//! Query values handed to a [`QueryClient`](crate::QueryClient).

use serde::{Deserialize, Serialize};

/// How a query is submitted under the SPARQL 1.1 protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// `GET ?query=...`
    Get,
    /// `POST` with `application/x-www-form-urlencoded` body
    #[default]
    PostUrlencoded,
    /// `POST` with `application/sparql-query` body
    PostDirect,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Get => write!(f, "get"),
            Operation::PostUrlencoded => write!(f, "post-urlencoded"),
            Operation::PostDirect => write!(f, "post-direct"),
        }
    }
}

/// A SPARQL query ready for execution.
///
/// The text is used verbatim in cache keys, so two queries that differ only
/// in whitespace are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    text: String,
    operation: Operation,
}

impl Query {
    /// Create a query sent with the default operation.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            operation: Operation::default(),
        }
    }

    /// Use a specific protocol operation.
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    /// Query text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Protocol operation.
    pub fn operation(&self) -> Operation {
        self.operation
    }
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Query::new(text)
    }
}

impl From<String> for Query {
    fn from(text: String) -> Self {
        Query::new(text)
    }
}
