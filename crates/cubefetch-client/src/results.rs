//! SPARQL 1.1 Query Results JSON parsing
//!
//! # Format
//!
//! ```json
//! {
//!   "head": { "vars": ["cube", "label"] },
//!   "results": { "bindings": [
//!     { "cube":  { "type": "uri", "value": "https://example.org/cube/1" },
//!       "label": { "type": "literal", "value": "Population", "xml:lang": "en" } }
//!   ] }
//! }
//! ```
//!
//! ASK queries answer with `{"head": {}, "boolean": true}` instead; that is
//! surfaced as a single row binding `boolean`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{FetchError, Result};

/// Datatype IRI of `xsd:boolean`.
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";

/// An RDF term bound to a result variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum Term {
    /// Named node
    Iri(String),
    /// Blank node label, scoped to one result document
    BlankNode(String),
    /// Literal value
    Literal(Literal),
}

/// A literal with optional datatype or language tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Literal {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Term {
    /// Lexical value of the term.
    pub fn value(&self) -> &str {
        match self {
            Term::Iri(v) | Term::BlankNode(v) => v,
            Term::Literal(lit) => &lit.value,
        }
    }

    /// IRI string, if this is a named node.
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(v) => Some(v),
            _ => None,
        }
    }

    /// Language tag, if this is a language-tagged literal.
    pub fn language(&self) -> Option<&str> {
        match self {
            Term::Literal(lit) => lit.language.as_deref(),
            _ => None,
        }
    }
}

/// One solution: variable name → bound term. Unbound variables are absent.
pub type Row = BTreeMap<String, Term>;

#[derive(Debug, Deserialize)]
struct ResultsDocument {
    #[serde(default)]
    results: Option<ResultsBody>,
    #[serde(default)]
    boolean: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ResultsBody {
    bindings: Vec<HashMap<String, RawTerm>>,
}

#[derive(Debug, Deserialize)]
struct RawTerm {
    #[serde(rename = "type")]
    kind: String,
    value: serde_json::Value,
    #[serde(rename = "xml:lang", default)]
    lang: Option<String>,
    #[serde(default)]
    datatype: Option<String>,
}

impl RawTerm {
    fn into_term(self, var: &str) -> Result<Term> {
        let serde_json::Value::String(value) = self.value else {
            return Err(FetchError::malformed(format!(
                "binding '{}' of type '{}' has a non-string value",
                var, self.kind
            )));
        };

        match self.kind.as_str() {
            "uri" => Ok(Term::Iri(value)),
            "bnode" => Ok(Term::BlankNode(value)),
            // "typed-literal" is the pre-1.1 spelling some endpoints still emit
            "literal" | "typed-literal" => Ok(Term::Literal(Literal {
                value,
                // A language tag implies rdf:langString; keep datatype empty then
                datatype: if self.lang.is_some() {
                    None
                } else {
                    self.datatype
                },
                language: self.lang,
            })),
            other => Err(FetchError::malformed(format!(
                "binding '{}' has unsupported term type '{}'",
                var, other
            ))),
        }
    }
}

/// Parse a `application/sparql-results+json` body into rows.
pub fn parse_json_results(body: &[u8]) -> Result<Vec<Row>> {
    let doc: ResultsDocument = serde_json::from_slice(body)?;

    if let Some(results) = doc.results {
        return results
            .bindings
            .into_iter()
            .map(|binding| {
                binding
                    .into_iter()
                    .map(|(var, raw)| {
                        let term = raw.into_term(&var)?;
                        Ok((var, term))
                    })
                    .collect::<Result<Row>>()
            })
            .collect();
    }

    if let Some(answer) = doc.boolean {
        let mut row = Row::new();
        row.insert(
            "boolean".to_string(),
            Term::Literal(Literal {
                value: answer.to_string(),
                datatype: Some(XSD_BOOLEAN.to_string()),
                language: None,
            }),
        );
        return Ok(vec![row]);
    }

    Err(FetchError::malformed(
        "document has neither 'results' nor 'boolean'",
    ))
}
