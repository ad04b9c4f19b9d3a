//! cubefetch-core: batched, cached loading of query results
//!
//! This crate turns a long list of identifiers into a handful of remote
//! queries:
//! - [`BatchLoader`]: partitions identifiers, runs one query per batch
//!   concurrently and concatenates the rows in batch order
//! - [`QueryCache`]: injected memoization of parsed rows, with
//!   [`MemoryCache`] and [`LruQueryCache`] implementations
//! - [`InflightRequests`]: single-flight coalescing of identical queries
//! - [`BatchOutcome`]: rows plus the batches that failed
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cubefetch_client::{HttpClientConfig, HttpSparqlClient, Iri, QueryTemplate};
//! use cubefetch_core::{BatchLoader, MemoryCache};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpSparqlClient::new(HttpClientConfig::new("https://lindas.admin.ch/query"))?;
//!     let loader = BatchLoader::new(Arc::new(client))
//!         .with_batch_size(200)
//!         .with_cache(Arc::new(MemoryCache::new()));
//!
//!     let template = QueryTemplate::new(
//!         "SELECT ?cube ?name WHERE { {{VALUES}} ?cube <http://schema.org/name> ?name }",
//!         "cube",
//!     )?;
//!     let cubes = vec![Iri::parse("https://environment.ld.admin.ch/foen/ubd003701/2")?];
//!
//!     let outcome = loader.load_template(&template, &cubes).await;
//!     for failure in outcome.failures() {
//!         eprintln!("batch {} failed: {}", failure.index, failure.error);
//!     }
//!     println!("{} rows", outcome.rows().len());
//!     Ok(())
//! }
//! ```

mod batch;
mod cache;
mod error;
pub mod factory;
mod inflight;
mod loader;
mod outcome;

pub use batch::{batch_count, partition, Batch};
pub use cache::{CacheKey, CacheMetrics, LruQueryCache, MemoryCache, QueryCache, Rows};
pub use error::CoreError;
pub use inflight::InflightRequests;
pub use loader::{BatchLoader, DEFAULT_BATCH_SIZE, DEFAULT_MAX_CONCURRENT_BATCHES};
pub use outcome::{BatchFailure, BatchOutcome};

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
