//! Batched, cached query loading.
//!
//! [`BatchLoader`] splits a list of identifiers into batches, builds one
//! query per batch and runs them concurrently through a [`QueryClient`].
//! Results are concatenated in batch order.
//!
//! ## Failure policy
//!
//! A failing batch never aborts its siblings and never turns the whole load
//! into an error. It is logged, recorded in the [`BatchOutcome`] and
//! contributes no rows; callers that need all-or-nothing use
//! [`BatchOutcome::into_result`].
//!
//! ## Shared state
//!
//! The concurrency limiter and the in-flight registry belong to the loader
//! (and its clones), so limits and coalescing apply across every `load`
//! running on the same instance.

use std::sync::Arc;
use std::time::Instant;

use cubefetch_client::{Iri, Query, QueryClient, QueryTemplate, Result};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, trace, warn};

use crate::batch::partition;
use crate::cache::{CacheKey, QueryCache, Rows};
use crate::inflight::InflightRequests;
use crate::outcome::{BatchFailure, BatchOutcome};

/// Identifiers per batch unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = cubefetch_config::DEFAULT_BATCH_SIZE;

/// Batches allowed in flight at once unless configured otherwise
pub const DEFAULT_MAX_CONCURRENT_BATCHES: usize = cubefetch_config::DEFAULT_MAX_CONCURRENT_BATCHES;

/// Loads rows for many identifiers with one query per batch.
pub struct BatchLoader<C: QueryClient + ?Sized> {
    client: Arc<C>,
    cache: Option<Arc<dyn QueryCache>>,
    inflight: Option<Arc<InflightRequests>>,
    limiter: Option<Arc<Semaphore>>,
    batch_size: usize,
    max_concurrent_batches: usize,
}

impl<C: QueryClient + ?Sized + 'static> BatchLoader<C> {
    /// Create a loader with default batch size and concurrency, coalescing
    /// enabled and no cache.
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            cache: None,
            inflight: Some(Arc::new(InflightRequests::new())),
            limiter: Some(Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_BATCHES))),
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrent_batches: DEFAULT_MAX_CONCURRENT_BATCHES,
        }
    }

    /// Set identifiers per batch. 0 is treated as 1.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Cap simultaneous remote calls. 0 removes the cap.
    pub fn with_max_concurrent_batches(mut self, max: usize) -> Self {
        self.max_concurrent_batches = max;
        self.limiter = (max > 0).then(|| Arc::new(Semaphore::new(max)));
        self
    }

    /// Memoize results in `cache`.
    pub fn with_cache(mut self, cache: Arc<dyn QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Enable or disable single-flight coalescing of identical queries.
    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.inflight = enabled.then(|| Arc::new(InflightRequests::new()));
        self
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn cache(&self) -> Option<&Arc<dyn QueryCache>> {
        self.cache.as_ref()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Configured cap, 0 when unbounded
    pub fn max_concurrent_batches(&self) -> usize {
        self.max_concurrent_batches
    }

    pub fn is_coalescing(&self) -> bool {
        self.inflight.is_some()
    }

    /// Load rows for `ids`, building each batch's query with `build`.
    ///
    /// `build` receives the batch's identifiers and its index. Rows come back
    /// in batch order; within a batch, in the order the endpoint returned them.
    pub async fn load<I, F>(&self, ids: &[I], build: F) -> BatchOutcome
    where
        F: Fn(&[I], usize) -> Query,
    {
        let batches = partition(ids, self.batch_size);
        if batches.is_empty() {
            debug!("No identifiers to load");
            return BatchOutcome::default();
        }

        let total = batches.len();
        let started = Instant::now();
        debug!(
            "Loading {} identifiers in {} batches of up to {}",
            ids.len(),
            total,
            self.batch_size
        );

        let futures = batches.iter().map(|batch| {
            let query = build(batch.ids, batch.index);
            let (index, size) = (batch.index, batch.len());
            async move {
                debug!("Dispatching batch {} ({} identifiers)", index, size);
                let (result, cached) = self.fetch_query(query).await;
                (index, size, result, cached)
            }
        });

        let results = join_all(futures).await;

        let mut rows = Vec::new();
        let mut failures = Vec::new();
        let mut cache_hits = 0;
        for (index, size, result, cached) in results {
            match result {
                Ok(batch_rows) => {
                    if cached {
                        cache_hits += 1;
                    }
                    rows.extend(batch_rows.iter().cloned());
                }
                Err(error) => {
                    warn!(
                        "Batch {} of {} ({} identifiers) failed: {}",
                        index + 1,
                        total,
                        size,
                        error
                    );
                    failures.push(BatchFailure { index, size, error });
                }
            }
        }

        info!(
            "Loaded {} rows from {} batches ({} failed, {} cached) in {:?}",
            rows.len(),
            total,
            failures.len(),
            cache_hits,
            started.elapsed()
        );

        BatchOutcome::new(rows, failures, total, cache_hits)
    }

    /// Load rows for `iris` by rendering `template` once per batch.
    pub async fn load_template(&self, template: &QueryTemplate, iris: &[Iri]) -> BatchOutcome {
        self.load(iris, |batch, _| template.render(batch)).await
    }

    /// Run a single query through the cache, coalescing and limiter.
    pub async fn fetch(&self, query: &Query) -> Result<Rows> {
        self.fetch_query(query.clone()).await.0
    }

    /// Returns the rows and whether they came from the cache.
    async fn fetch_query(&self, query: Query) -> (Result<Rows>, bool) {
        let key = CacheKey::new(self.client.endpoint(), query.text());

        if let Some(cache) = &self.cache {
            if let Some(rows) = cache.get(&key) {
                trace!("Cache hit for {}", key);
                return (Ok(rows), true);
            }
        }

        let remote = fetch_remote(
            Arc::clone(&self.client),
            self.cache.clone(),
            self.limiter.clone(),
            key.clone(),
            query,
        );

        let result = match &self.inflight {
            Some(inflight) => inflight.run(key, move || remote).await.0,
            None => remote.await,
        };
        (result, false)
    }
}

/// Execute `query` under the limiter and store a successful result.
async fn fetch_remote<C: QueryClient + ?Sized>(
    client: Arc<C>,
    cache: Option<Arc<dyn QueryCache>>,
    limiter: Option<Arc<Semaphore>>,
    key: CacheKey,
    query: Query,
) -> Result<Rows> {
    // acquire only fails on a closed semaphore and this one is never closed
    let _permit = match limiter {
        Some(limiter) => limiter.acquire_owned().await.ok(),
        None => None,
    };

    let rows: Rows = client.execute(&query).await?.into();

    if let Some(cache) = cache {
        cache.set(key, Arc::clone(&rows));
    }
    Ok(rows)
}

/// Clones share the client, cache, limiter and in-flight registry.
impl<C: QueryClient + ?Sized> Clone for BatchLoader<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            cache: self.cache.clone(),
            inflight: self.inflight.clone(),
            limiter: self.limiter.clone(),
            batch_size: self.batch_size,
            max_concurrent_batches: self.max_concurrent_batches,
        }
    }
}

impl<C: QueryClient + ?Sized> std::fmt::Debug for BatchLoader<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchLoader")
            .field("endpoint", &self.client.endpoint())
            .field("batch_size", &self.batch_size)
            .field("max_concurrent_batches", &self.max_concurrent_batches)
            .field("cached", &self.cache.is_some())
            .field("coalescing", &self.inflight.is_some())
            .finish()
    }
}
