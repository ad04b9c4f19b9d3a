//! cubefetch-client: SPARQL query execution
//!
//! This crate is the query executor of cubefetch. It provides:
//! - [`Query`] and [`Operation`]: a query plus the SPARQL 1.1 protocol mode
//! - [`QueryClient`]: the async trait batch loaders run queries through
//! - [`HttpSparqlClient`]: a `reqwest` based implementation with retries
//! - [`parse_json_results`]: SPARQL JSON results into [`Row`]s
//! - [`Iri`], [`values_clause`] and [`QueryTemplate`] for building batch
//!   queries over lists of identifiers

pub mod error;
pub mod http;
pub mod query;
pub mod results;
pub mod sparql;
pub mod traits;

pub use error::{FetchError, Result};
pub use http::{Auth, HttpClientConfig, HttpSparqlClient};
pub use query::{Operation, Query};
pub use results::{parse_json_results, Literal, Row, Term};
pub use sparql::{values_clause, Iri, QueryTemplate, VALUES_PLACEHOLDER};
pub use traits::QueryClient;
