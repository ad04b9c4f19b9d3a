//! Query client trait
//!
//! Core abstraction for executing a query against a remote endpoint:
//! - `HttpSparqlClient` - SPARQL 1.1 protocol over HTTP
//! - test doubles in downstream crates
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`; a single client is shared by every
//! concurrently running batch.

use async_trait::async_trait;

use crate::error::Result;
use crate::query::Query;
use crate::results::Row;

/// Executes queries and returns parsed rows.
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Identity of the endpoint, used as the first half of cache keys.
    ///
    /// Two clients returning the same identity are assumed to answer the
    /// same query identically.
    fn endpoint(&self) -> &str;

    /// Run `query` and return its solutions.
    ///
    /// Network and parse failures are both reported as `Err`.
    async fn execute(&self, query: &Query) -> Result<Vec<Row>>;
}

#[async_trait]
impl<C: QueryClient + ?Sized> QueryClient for std::sync::Arc<C> {
    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }

    async fn execute(&self, query: &Query) -> Result<Vec<Row>> {
        (**self).execute(query).await
    }
}
