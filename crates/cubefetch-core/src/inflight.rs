//! Single-flight coalescing of identical requests.
//!
//! While a fetch for a key is running, later callers for the same key await
//! the running fetch instead of starting their own. The fetch removes its
//! entry in the same poll that produces its result, and the leader removes it
//! if dropped first. A finished fetch is never joined; serving completed
//! results is the cache's job.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cubefetch_client::{FetchError, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::trace;

use crate::cache::{CacheKey, Rows};

type SharedFetch = Shared<BoxFuture<'static, std::result::Result<Rows, FetchError>>>;

/// A running fetch, tagged so a stale release cannot remove a newer fetch.
struct Entry {
    id: u64,
    fetch: SharedFetch,
}

type Pending = Arc<Mutex<HashMap<CacheKey, Entry>>>;

/// Registry of running fetches keyed by [`CacheKey`].
#[derive(Default)]
pub struct InflightRequests {
    pending: Pending,
    next_id: AtomicU64,
}

impl InflightRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fetches currently running
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Run `fetch` for `key`, or join an identical fetch already running.
    ///
    /// `fetch` is only called by the leader. Errors are delivered to every
    /// joiner. Returns the result and whether this call joined another.
    pub async fn run<F, Fut>(&self, key: CacheKey, fetch: F) -> (Result<Rows>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Rows>> + Send + 'static,
    {
        let (shared, guard) = {
            let mut pending = self.pending.lock();
            match pending.get(&key) {
                Some(running) => (running.fetch.clone(), None),
                None => {
                    let release = Release {
                        pending: Arc::clone(&self.pending),
                        key: key.clone(),
                        id: self.next_id.fetch_add(1, Ordering::Relaxed),
                    };
                    let id = release.id;
                    let work = fetch();
                    let shared = async move {
                        let result = work.await;
                        release.now();
                        result
                    }
                    .boxed()
                    .shared();
                    pending.insert(
                        key.clone(),
                        Entry {
                            id,
                            fetch: shared.clone(),
                        },
                    );
                    let guard = Release {
                        pending: Arc::clone(&self.pending),
                        key,
                        id,
                    };
                    (shared, Some(guard))
                }
            }
        };

        let joined = guard.is_none();
        if joined {
            trace!("Joining in-flight fetch");
        }

        let result = shared.await;
        if let Some(guard) = guard {
            guard.now();
        }
        (result, joined)
    }
}

impl std::fmt::Debug for InflightRequests {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InflightRequests")
            .field("pending", &self.len())
            .finish()
    }
}

/// Removes one fetch's entry, explicitly or on drop when the leader is cancelled.
struct Release {
    pending: Pending,
    key: CacheKey,
    id: u64,
}

impl Release {
    fn now(self) {}
}

impl Drop for Release {
    fn drop(&mut self) {
        let removed = {
            let mut pending = self.pending.lock();
            // Only remove our own entry, never a newer fetch for the same key
            if pending.get(&self.key).is_some_and(|entry| entry.id == self.id) {
                pending.remove(&self.key)
            } else {
                None
            }
        };
        // Dropping the last handle drops the fetch and its own Release, which
        // locks `pending` again
        drop(removed);
    }
}
