//! Integration tests for BatchLoader against a scripted client.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cubefetch_client::{FetchError, Iri, Query, QueryClient, QueryTemplate, Result, Row, Term};
use cubefetch_core::{BatchLoader, CacheKey, LruQueryCache, MemoryCache, QueryCache};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

/// Client that answers `VALUES`-style queries with one row per identifier,
/// counts calls and tracks how many run at once.
struct ScriptedClient {
    calls: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
    failing: Mutex<HashSet<String>>,
}

impl ScriptedClient {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delay: Duration::ZERO,
            failing: Mutex::new(HashSet::new()),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail any query whose text contains `marker`.
    fn fail_on(self, marker: &str) -> Self {
        self.failing.lock().insert(marker.to_string());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryClient for ScriptedClient {
    fn endpoint(&self) -> &str {
        "mock://scripted"
    }

    async fn execute(&self, query: &Query) -> Result<Vec<Row>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        let failing = self
            .failing
            .lock()
            .iter()
            .any(|marker| query.text().contains(marker.as_str()));
        if failing {
            return Err(FetchError::http(503, "service unavailable"));
        }

        // One row per <iri> in the query, in query order
        Ok(query
            .text()
            .split('<')
            .skip(1)
            .filter_map(|part| part.split_once('>'))
            .map(|(iri, _)| {
                let mut row = Row::new();
                row.insert("item".to_string(), Term::Iri(iri.to_string()));
                row
            })
            .collect())
    }
}

fn iris(n: usize) -> Vec<Iri> {
    (0..n)
        .map(|i| Iri::parse(format!("https://example.org/item/{}", i)).unwrap())
        .collect()
}

fn template() -> QueryTemplate {
    QueryTemplate::new("SELECT ?item WHERE { {{VALUES}} }", "item").unwrap()
}

fn items(rows: &[Row]) -> Vec<String> {
    rows.iter().map(|r| r["item"].value().to_string()).collect()
}

#[tokio::test]
async fn test_batch_count_and_sizes() {
    let client = Arc::new(ScriptedClient::new());
    let loader = BatchLoader::new(Arc::clone(&client)).with_batch_size(4);

    let sizes = Mutex::new(Vec::new());
    let ids = iris(10);
    let outcome = loader
        .load(&ids, |batch, _| {
            sizes.lock().push(batch.len());
            template().render(batch)
        })
        .await;

    assert_eq!(outcome.batch_count(), 3);
    assert_eq!(client.calls(), 3);
    assert_eq!(*sizes.lock(), vec![4, 4, 2]);
}

#[tokio::test]
async fn test_rows_concatenated_in_batch_order() {
    // Unbounded concurrency with a delay so batches finish interleaved
    let client = Arc::new(ScriptedClient::new().with_delay(Duration::from_millis(5)));
    let loader = BatchLoader::new(Arc::clone(&client))
        .with_batch_size(3)
        .with_max_concurrent_batches(0);

    let ids = iris(10);
    let outcome = loader.load_template(&template(), &ids).await;

    let expected: Vec<String> = ids.iter().map(|iri| iri.as_str().to_string()).collect();
    assert_eq!(items(outcome.rows()), expected);
    assert!(outcome.is_complete());
}

#[tokio::test]
async fn test_cached_fetch_skips_executor() {
    let client = Arc::new(ScriptedClient::new());
    let cache = Arc::new(MemoryCache::new());
    let loader = BatchLoader::new(Arc::clone(&client))
        .with_batch_size(2)
        .with_cache(cache.clone());

    let ids = iris(4);
    let first = loader.load_template(&template(), &ids).await;
    assert_eq!(client.calls(), 2);
    assert_eq!(first.cache_hits(), 0);

    let second = loader.load_template(&template(), &ids).await;
    assert_eq!(client.calls(), 2);
    assert_eq!(second.cache_hits(), 2);
    assert_eq!(items(second.rows()), items(first.rows()));

    // The cached allocation itself is handed back
    let query = template().render(&ids[..2]);
    let fetched = loader.fetch(&query).await.unwrap();
    let stored = cache
        .get(&CacheKey::new("mock://scripted", query.text()))
        .unwrap();
    assert!(Arc::ptr_eq(&fetched, &stored));
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn test_changed_query_text_misses_cache() {
    let client = Arc::new(ScriptedClient::new());
    let loader =
        BatchLoader::new(Arc::clone(&client)).with_cache(Arc::new(MemoryCache::new()));

    let ids = iris(3);
    loader.load_template(&template(), &ids).await;
    assert_eq!(client.calls(), 1);

    let other = QueryTemplate::new("SELECT DISTINCT ?item WHERE { {{VALUES}} }", "item").unwrap();
    let outcome = loader.load_template(&other, &ids).await;
    assert_eq!(client.calls(), 2);
    assert_eq!(outcome.cache_hits(), 0);
}

#[tokio::test]
async fn test_failed_batch_is_isolated() {
    let ids = iris(3);
    // Batch 1 (the second) holds item/1 only
    let client = Arc::new(ScriptedClient::new().fail_on("item/1>"));
    let cache = Arc::new(MemoryCache::new());
    let loader = BatchLoader::new(Arc::clone(&client))
        .with_batch_size(1)
        .with_cache(cache.clone());

    let outcome = loader.load_template(&template(), &ids).await;

    assert_eq!(
        items(outcome.rows()),
        vec![
            "https://example.org/item/0".to_string(),
            "https://example.org/item/2".to_string()
        ]
    );
    assert_eq!(outcome.failures().len(), 1);
    let failure = &outcome.failures()[0];
    assert_eq!(failure.index, 1);
    assert_eq!(failure.size, 1);
    assert_eq!(failure.error, FetchError::http(503, "service unavailable"));

    // Failures are not cached
    assert_eq!(cache.len(), 2);
    assert_eq!(
        outcome.into_result().unwrap_err(),
        FetchError::PartialFailure { failed: 1, total: 3 }
    );
}

#[tokio::test]
async fn test_no_cache_always_executes() {
    let client = Arc::new(ScriptedClient::new());
    let loader = BatchLoader::new(Arc::clone(&client));

    let ids = iris(2);
    loader.load_template(&template(), &ids).await;
    loader.load_template(&template(), &ids).await;

    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn test_concurrency_cap_is_respected() {
    let client = Arc::new(ScriptedClient::new().with_delay(Duration::from_millis(10)));
    let loader = BatchLoader::new(Arc::clone(&client))
        .with_batch_size(1)
        .with_max_concurrent_batches(3);

    let outcome = loader.load_template(&template(), &iris(12)).await;

    assert_eq!(outcome.batch_count(), 12);
    assert_eq!(client.calls(), 12);
    assert!(client.peak() <= 3, "peak was {}", client.peak());
    assert!(client.peak() >= 2);
}

#[tokio::test]
async fn test_concurrency_cap_spans_loads() {
    let client = Arc::new(ScriptedClient::new().with_delay(Duration::from_millis(10)));
    let loader = BatchLoader::new(Arc::clone(&client))
        .with_batch_size(1)
        .with_max_concurrent_batches(2)
        .with_coalescing(false);

    let ids_a = iris(4);
    let ids_b: Vec<Iri> = (10..14)
        .map(|i| Iri::parse(format!("https://example.org/other/{}", i)).unwrap())
        .collect();
    let query = template();
    let (a, b) = tokio::join!(
        loader.load_template(&query, &ids_a),
        loader.load_template(&query, &ids_b)
    );

    assert!(a.is_complete() && b.is_complete());
    assert!(client.peak() <= 2, "peak was {}", client.peak());
}

#[tokio::test]
async fn test_concurrent_identical_loads_coalesce() {
    let client = Arc::new(ScriptedClient::new().with_delay(Duration::from_millis(20)));
    let loader = BatchLoader::new(Arc::clone(&client));

    let ids = iris(5);
    let query = template();
    let (a, b) = tokio::join!(
        loader.load_template(&query, &ids),
        loader.load_template(&query, &ids)
    );

    assert_eq!(client.calls(), 1);
    assert_eq!(items(a.rows()), items(b.rows()));
    // Joining is not a cache hit
    assert_eq!(a.cache_hits() + b.cache_hits(), 0);
}

#[tokio::test]
async fn test_coalescing_disabled_issues_both_calls() {
    let client = Arc::new(ScriptedClient::new().with_delay(Duration::from_millis(20)));
    let loader = BatchLoader::new(Arc::clone(&client)).with_coalescing(false);

    let ids = iris(5);
    let query = template();
    tokio::join!(
        loader.load_template(&query, &ids),
        loader.load_template(&query, &ids)
    );

    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn test_lru_cache_bounded() {
    let client = Arc::new(ScriptedClient::new());
    let cache = Arc::new(LruQueryCache::with_capacity(2).unwrap());
    let loader = BatchLoader::new(Arc::clone(&client))
        .with_batch_size(1)
        .with_cache(cache.clone());

    loader.load_template(&template(), &iris(3)).await;
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.metrics().evictions, 1);
}

#[tokio::test]
async fn test_clones_share_cache() {
    let client = Arc::new(ScriptedClient::new());
    let loader = BatchLoader::new(Arc::clone(&client)).with_cache(Arc::new(MemoryCache::new()));
    let clone = loader.clone();

    let ids = iris(2);
    loader.load_template(&template(), &ids).await;
    let outcome = clone.load_template(&template(), &ids).await;

    assert_eq!(client.calls(), 1);
    assert_eq!(outcome.cache_hits(), 1);
}

#[tokio::test]
async fn test_trait_object_client() {
    let client: Arc<dyn QueryClient> = Arc::new(ScriptedClient::new());
    let loader = BatchLoader::new(client);

    let outcome = loader.load_template(&template(), &iris(3)).await;
    assert_eq!(outcome.rows().len(), 3);
}
