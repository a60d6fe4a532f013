//! In-memory TTL cache with request coalescing
//!
//! Provides a `CoalescingCache` that serves fresh entries directly, and on a miss
//! runs a single loader per key no matter how many callers are waiting for it.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Errors surfaced by a cache lookup
///
/// Cloneable so that one failed fetch can be handed to every caller that
/// joined it.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The loader returned an error
    #[error("{0}")]
    Load(Arc<dyn std::error::Error + Send + Sync>),

    /// The loader task panicked or was aborted before producing a value
    #[error("loader for {cache} did not complete: {reason}")]
    Aborted { cache: &'static str, reason: String },
}

/// A stored value, replaced wholesale by each successful fetch
#[derive(Debug)]
struct CacheEntry<V> {
    /// The cached data
    data: V,
    /// When the fetch that produced the data completed
    cached_at: DateTime<Utc>,
    /// Monotonic counterpart of `cached_at`, used for expiry
    stored_at: Instant,
}

/// Result of reading from the cache
#[derive(Debug, Clone)]
pub struct CachedData<V> {
    /// The cached data
    pub data: V,
    /// When the data was fetched from upstream
    pub cached_at: DateTime<Utc>,
}

impl<V: Clone> CacheEntry<V> {
    fn to_cached(&self) -> CachedData<V> {
        CachedData {
            data: self.data.clone(),
            cached_at: self.cached_at,
        }
    }
}

type LoadResult<V> = Result<CachedData<V>, CacheError>;
type InFlightFetch<V> = Shared<BoxFuture<'static, LoadResult<V>>>;
type Loader<K, V> = Arc<dyn Fn(K) -> BoxFuture<'static, Result<V, CacheError>> + Send + Sync>;
type Slots<K, V> = Arc<Mutex<HashMap<K, Slot<V>>>>;

/// Per-key state: the last good entry and the fetch currently running, if any
struct Slot<V> {
    entry: Option<CacheEntry<V>>,
    in_flight: Option<InFlightFetch<V>>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            entry: None,
            in_flight: None,
        }
    }
}

fn lock<K, V>(slots: &Mutex<HashMap<K, Slot<V>>>) -> MutexGuard<'_, HashMap<K, Slot<V>>> {
    // The map is only ever mutated in short non-panicking sections.
    slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clears the in-flight marker for a key when the fetch task ends, however it ends.
struct InFlightGuard<K: Eq + Hash, V> {
    slots: Slots<K, V>,
    key: Option<K>,
}

impl<K: Eq + Hash, V> Drop for InFlightGuard<K, V> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            if let Some(slot) = lock(&self.slots).get_mut(&key) {
                slot.in_flight = None;
            }
        }
    }
}

/// A read-through cache that coalesces concurrent misses for the same key
///
/// Each key holds at most one entry and at most one in-flight fetch. Entries
/// older than the TTL are never served; a caller arriving while a fetch is
/// running waits on that fetch instead of starting another one. Failed
/// fetches are not cached, so the next call retries.
pub struct CoalescingCache<K, V> {
    /// Name used in log output
    name: &'static str,
    /// How long an entry is considered fresh
    ttl: Duration,
    loader: Loader<K, V>,
    slots: Slots<K, V>,
}

impl<K, V> CoalescingCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache that fills misses with `loader`
    ///
    /// # Arguments
    /// * `name` - Label for log output (e.g., "quotes")
    /// * `ttl` - How long a fetched value may be served
    /// * `loader` - Fetches the value for a key; any error is handed to callers as `CacheError::Load`
    pub fn new<F, Fut, E>(name: &'static str, ttl: Duration, loader: F) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let loader: Loader<K, V> = Arc::new(move |key| {
            let load = loader(key);
            async move { load.await.map_err(|e| CacheError::Load(Arc::new(e))) }.boxed()
        });

        Self {
            name,
            ttl,
            loader,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Gets the value for `key`, fetching it if there is no fresh entry
    ///
    /// # Behavior
    /// - A fresh entry is returned immediately without calling the loader
    /// - If a fetch for the key is already running, waits for its outcome
    /// - Otherwise starts a fetch and waits for it
    pub async fn get(&self, key: K) -> Result<CachedData<V>, CacheError> {
        let fetch = {
            let mut slots = lock(&self.slots);
            let slot = slots.entry(key.clone()).or_default();

            if let Some(entry) = &slot.entry {
                if entry.stored_at.elapsed() < self.ttl {
                    debug!(cache = self.name, ?key, "cache hit");
                    return Ok(entry.to_cached());
                }
            }

            match slot.in_flight.clone() {
                Some(fetch) => {
                    debug!(cache = self.name, ?key, "joining in-flight fetch");
                    fetch
                }
                None => {
                    let fetch = self.start_fetch(key);
                    slot.in_flight = Some(fetch.clone());
                    fetch
                }
            }
        };

        fetch.await
    }

    /// Returns the stored entry for `key` regardless of its age, without fetching
    #[cfg(test)]
    fn peek(&self, key: &K) -> Option<CachedData<V>> {
        lock(&self.slots)
            .get(key)
            .and_then(|slot| slot.entry.as_ref())
            .map(CacheEntry::to_cached)
    }

    /// Spawns the loader for `key` and returns a future every caller can share
    ///
    /// The fetch runs on its own task so it completes even if all callers go away.
    fn start_fetch(&self, key: K) -> InFlightFetch<V> {
        info!(cache = self.name, ?key, "cache miss, fetching");

        let name = self.name;
        let load = (self.loader)(key.clone());
        let slots = Arc::clone(&self.slots);

        let task = tokio::spawn(async move {
            let _guard = InFlightGuard {
                slots: Arc::clone(&slots),
                key: Some(key.clone()),
            };

            match load.await {
                Ok(data) => {
                    let entry = CacheEntry {
                        data,
                        cached_at: Utc::now(),
                        stored_at: Instant::now(),
                    };
                    let cached = entry.to_cached();
                    lock(&slots).entry(key).or_default().entry = Some(entry);
                    Ok(cached)
                }
                Err(e) => {
                    warn!(cache = name, ?key, error = %e, "fetch failed, keeping previous entry");
                    Err(e)
                }
            }
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(CacheError::Aborted {
                    cache: name,
                    reason: e.to_string(),
                })
            })
        }
        .boxed()
        .shared()
    }
}
