//! Query result cache with stale-while-revalidate semantics.
//!
//! - [`QueryCache`] - time-boxed map of normalized queries to results
//! - [`SharedCache`] - process-wide handle pairing the cache with an in-flight
//!   request table, so pickers of the same entity type share both results and
//!   pending requests
//!
//! Every entry moves through three phases:
//!
//! ```text
//! fetched_at ........ stale_at ........ expires_at ........
//!    fresh              stale-but-usable        evicted
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;

use super::lock;
use super::retry::RetryPolicy;
use crate::core::{CacheKey, DataSource, SearchQuery, SearchResult};
use crate::error::FetchError;

/// Freshness windows for cached results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTiming {
    /// Served without revalidation for this long after fetching.
    pub stale_time: Duration,
    /// Kept (and served while revalidating) for this long after going stale.
    pub cache_time: Duration,
}

impl Default for CacheTiming {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_millis(600_000),
            cache_time: Duration::from_millis(120_000),
        }
    }
}

/// A cached result with its freshness deadlines. `stale_at <= expires_at`.
#[derive(Debug, Clone)]
pub struct CacheEntry<E> {
    pub key: CacheKey,
    pub result: Arc<SearchResult<E>>,
    pub stale_at: Instant,
    pub expires_at: Instant,
}

impl<E> CacheEntry<E> {
    fn new(key: CacheKey, result: Arc<SearchResult<E>>, timing: CacheTiming) -> Self {
        let stale_at = result.fetched_at + timing.stale_time;
        let expires_at = stale_at + timing.cache_time;
        Self {
            key,
            result,
            stale_at,
            expires_at,
        }
    }

    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.stale_at
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone)]
pub enum CacheLookup<E> {
    Fresh(Arc<SearchResult<E>>),
    Stale(Arc<SearchResult<E>>),
    Miss,
}

/// Default bound on cached queries per entity type.
pub const DEFAULT_MAX_ENTRIES: usize = 500;

/// Time-boxed, bounded map of query results. Pure data; the caller supplies
/// `now`.
#[derive(Debug)]
pub struct QueryCache<E> {
    entries: HashMap<CacheKey, CacheEntry<E>>,
    max_entries: usize,
}

impl<E> Default for QueryCache<E> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl<E> QueryCache<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding at most `max_entries` queries.
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Classify the entry for `key`, evicting it if expired.
    pub fn lookup(&mut self, key: &CacheKey, now: Instant) -> CacheLookup<E> {
        let Some(entry) = self.entries.get(key) else {
            return CacheLookup::Miss;
        };

        if entry.is_expired(now) {
            self.entries.remove(key);
            CacheLookup::Miss
        } else if entry.is_fresh(now) {
            CacheLookup::Fresh(Arc::clone(&entry.result))
        } else {
            CacheLookup::Stale(Arc::clone(&entry.result))
        }
    }

    /// Store a result; deadlines are measured from its `fetched_at`.
    ///
    /// Entries expired by then are dropped first. If the cache is still
    /// full, the entry closest to going stale makes room.
    pub fn insert(&mut self, key: CacheKey, result: Arc<SearchResult<E>>, timing: CacheTiming) {
        self.purge_expired(result.fetched_at);

        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.evict_oldest();
        }

        let entry = CacheEntry::new(key.clone(), result, timing);
        self.entries.insert(key, entry);
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .values()
            .min_by_key(|e| e.stale_at)
            .map(|e| e.key.clone());

        if let Some(key) = oldest {
            tracing::debug!(term = %key.term, "cache full, evicting oldest entry");
            self.entries.remove(&key);
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry<E>> {
        self.entries.get(key)
    }

    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Failure after the retry budget ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub error: FetchError,
    pub attempts: u32,
}

/// Progress of an in-flight request, broadcast to everyone sharing it.
#[derive(Debug, Clone)]
pub enum FetchProgress<E> {
    /// Attempt `attempt` is running or waiting for its backoff to elapse.
    Pending {
        attempt: u32,
        last_error: Option<FetchError>,
        retry_in: Option<Duration>,
    },
    Done(Result<Arc<SearchResult<E>>, FetchFailure>),
}

/// Handle on a shared in-flight request.
pub struct InFlight<E> {
    progress: watch::Receiver<FetchProgress<E>>,
    wake: Arc<Notify>,
}

impl<E> Clone for InFlight<E> {
    fn clone(&self) -> Self {
        Self {
            progress: self.progress.clone(),
            wake: Arc::clone(&self.wake),
        }
    }
}

impl<E: Clone> InFlight<E> {
    /// Latest progress value, marking it as seen.
    pub fn progress(&mut self) -> FetchProgress<E> {
        self.progress.borrow_and_update().clone()
    }

    /// Wait until the progress value changes. Returns `false` once the
    /// request task is gone.
    pub async fn changed(&mut self) -> bool {
        self.progress.changed().await.is_ok()
    }

    /// Skip the current backoff wait and retry immediately.
    pub fn retry_now(&self) {
        self.wake.notify_one();
    }

    /// Wait for the final outcome.
    pub async fn wait(mut self) -> Result<Arc<SearchResult<E>>, FetchFailure> {
        loop {
            if let FetchProgress::Done(outcome) = &*self.progress.borrow_and_update() {
                return outcome.clone();
            }
            if self.progress.changed().await.is_err() {
                return match &*self.progress.borrow() {
                    FetchProgress::Done(outcome) => outcome.clone(),
                    FetchProgress::Pending { .. } => Err(FetchFailure {
                        error: FetchError::transport("request task ended without a result"),
                        attempts: 0,
                    }),
                };
            }
        }
    }
}

struct SharedInner<E> {
    entries: Mutex<QueryCache<E>>,
    inflight: Mutex<HashMap<CacheKey, InFlight<E>>>,
}

/// Cache plus in-flight table, shared by every picker of one entity type.
pub struct SharedCache<E> {
    inner: Arc<SharedInner<E>>,
}

impl<E> Clone for SharedCache<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> Default for SharedCache<E> {
    fn default() -> Self {
        Self {
            inner: Arc::new(SharedInner {
                entries: Mutex::new(QueryCache::new()),
                inflight: Mutex::new(HashMap::new()),
            }),
        }
    }
}

static REGISTRY: Lazy<Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

impl<E: Clone + Send + Sync + 'static> SharedCache<E> {
    /// A private cache, not shared with other pickers.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache for entity type `E`.
    pub fn global() -> Self {
        let mut registry = lock(&REGISTRY);
        let slot = registry
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(SharedCache::<E>::new()));

        match slot.downcast_ref::<SharedCache<E>>() {
            Some(cache) => cache.clone(),
            None => {
                let cache = SharedCache::<E>::new();
                *slot = Box::new(cache.clone());
                cache
            }
        }
    }

    pub fn lookup(&self, key: &CacheKey, now: Instant) -> CacheLookup<E> {
        lock(&self.inner.entries).lookup(key, now)
    }

    pub fn insert(&self, key: CacheKey, result: Arc<SearchResult<E>>, timing: CacheTiming) {
        lock(&self.inner.entries).insert(key, result, timing);
    }

    pub fn invalidate(&self, key: &CacheKey) -> bool {
        lock(&self.inner.entries).invalidate(key)
    }

    pub fn invalidate_all(&self) {
        lock(&self.inner.entries).invalidate_all();
    }

    pub fn purge_expired(&self, now: Instant) -> usize {
        lock(&self.inner.entries).purge_expired(now)
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner.entries).is_empty()
    }

    /// Number of requests currently in flight.
    pub fn pending(&self) -> usize {
        lock(&self.inner.inflight).len()
    }

    /// Join the in-flight request for `query`, or start one.
    ///
    /// The request runs on its own task, so dropping every handle doesn't
    /// abort it; its result still lands in the cache. With `retry_now`, a
    /// joined request sitting in backoff retries immediately.
    pub fn fetch(
        &self,
        source: &Arc<dyn DataSource<E>>,
        query: &SearchQuery,
        policy: RetryPolicy,
        timing: CacheTiming,
        retry_now: bool,
    ) -> InFlight<E> {
        let key = query.cache_key();
        let mut inflight = lock(&self.inner.inflight);

        if let Some(existing) = inflight.get(&key) {
            tracing::debug!(term = %key.term, "joining in-flight request");
            if retry_now {
                existing.retry_now();
            }
            return existing.clone();
        }

        let (tx, rx) = watch::channel(FetchProgress::Pending {
            attempt: 1,
            last_error: None,
            retry_in: None,
        });
        let handle = InFlight {
            progress: rx,
            wake: Arc::new(Notify::new()),
        };
        inflight.insert(key.clone(), handle.clone());
        drop(inflight);

        tracing::debug!(term = %key.term, limit = key.limit, "issuing request");

        let shared = Arc::clone(&self.inner);
        let source = Arc::clone(source);
        let query = query.clone();
        let wake = Arc::clone(&handle.wake);
        tokio::spawn(async move {
            let outcome = fetch_with_retry(source.as_ref(), &query, policy, &tx, &wake).await;
            if let Ok(result) = &outcome {
                lock(&shared.entries).insert(key.clone(), Arc::clone(result), timing);
            }
            tx.send_replace(FetchProgress::Done(outcome));
            lock(&shared.inflight).remove(&key);
        });

        handle
    }
}

async fn fetch_with_retry<E: Send + Sync + 'static>(
    source: &dyn DataSource<E>,
    query: &SearchQuery,
    policy: RetryPolicy,
    progress: &watch::Sender<FetchProgress<E>>,
    wake: &Notify,
) -> Result<Arc<SearchResult<E>>, FetchFailure> {
    let mut failures = 0u32;

    loop {
        match source.fetch_page(query.clone()).await {
            Ok(page) => {
                return Ok(Arc::new(SearchResult::from_page(page, Instant::now())));
            }
            Err(error) => {
                failures += 1;
                if !policy.should_retry(failures) {
                    tracing::warn!(term = %query.term, attempts = failures, error = %error, "request failed, retries exhausted");
                    return Err(FetchFailure {
                        error,
                        attempts: failures,
                    });
                }

                let delay = policy.delay_for_attempt(failures - 1);
                tracing::debug!(term = %query.term, attempt = failures, delay_ms = delay.as_millis() as u64, error = %error, "request failed, scheduling retry");
                progress.send_replace(FetchProgress::Pending {
                    attempt: failures + 1,
                    last_error: Some(error),
                    retry_in: Some(delay),
                });

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = wake.notified() => {
                        tracing::debug!(term = %query.term, "retry requested early");
                    }
                }
            }
        }
    }
}
