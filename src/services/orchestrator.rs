//! Debounced, cached, race-safe search against a [`DataSource`].
//!
//! Each keystroke goes through [`SearchOrchestrator::search`]. The display is
//! always derived from the last *validated* server result (the base): while a
//! newer term is pending, the base is filtered locally and marked
//! provisional; once the response for the active term arrives it replaces the
//! base and the display becomes authoritative.
//!
//! Every scheduled query carries a version token. Responses whose token is no
//! longer the latest are dropped, so a slow answer for "ac" can never
//! overwrite the list for "acme".

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::cache::{CacheLookup, CacheTiming, FetchProgress, InFlight, SharedCache};
use super::lock;
use super::retry::RetryPolicy;
use crate::config::PickerConfig;
use crate::core::{normalize_term, DataSource, Entity, FilterSet, RelevanceFilter, SearchQuery, SearchResult};
use crate::error::{FetchError, PickerError, PickerResult};

/// Tunables for one orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorOptions {
    pub debounce: Duration,
    pub timing: CacheTiming,
    pub retry: RetryPolicy,
    pub max_results: usize,
    /// Server-side filters sent with every query.
    pub filters: FilterSet,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self::from_config(&PickerConfig::default())
    }
}

impl OrchestratorOptions {
    pub fn from_config(config: &PickerConfig) -> Self {
        Self {
            debounce: config.search.debounce(),
            timing: config.search.cache_timing(),
            retry: config.retry.policy(),
            max_results: config.search.max_results,
            filters: config.search.filters.clone(),
        }
    }
}

/// Error state shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFailure {
    pub error: FetchError,
    /// Attempts made so far.
    pub attempts: u32,
    /// An automatic retry is still scheduled.
    pub retrying: bool,
}

/// Read-only view of the orchestrator state.
#[derive(Debug, Clone)]
pub struct SearchSnapshot<E> {
    /// Filtered and ranked items to display.
    pub items: Arc<[E]>,
    /// `items` came from a server response for `raw_term`.
    pub authoritative: bool,
    pub raw_term: String,
    /// Term of the last query that left the debounce window.
    pub debounced_term: String,
    /// Server-reported total for the base result.
    pub total: usize,
    /// A blocking fetch (no usable cache entry) is running.
    pub is_loading: bool,
    /// A background revalidation of stale data is running.
    pub is_refreshing: bool,
    pub error: Option<SearchFailure>,
    pub revision: u64,
}

struct State<E> {
    raw_term: String,
    debounced_term: String,
    latest_token: u64,
    base: Option<Arc<SearchResult<E>>>,
    base_term: String,
    display: Arc<[E]>,
    authoritative: bool,
    is_loading: bool,
    is_refreshing: bool,
    error: Option<SearchFailure>,
    debounce: Option<JoinHandle<()>>,
    tasks: Vec<JoinHandle<()>>,
}

impl<E> State<E> {
    fn new() -> Self {
        Self {
            raw_term: String::new(),
            debounced_term: String::new(),
            latest_token: 0,
            base: None,
            base_term: String::new(),
            display: Vec::new().into(),
            authoritative: false,
            is_loading: false,
            is_refreshing: false,
            error: None,
            debounce: None,
            tasks: Vec::new(),
        }
    }

    fn next_token(&mut self) -> u64 {
        self.latest_token += 1;
        self.latest_token
    }

    fn abort_debounce(&mut self) {
        if let Some(handle) = self.debounce.take() {
            handle.abort();
        }
    }

    fn track(&mut self, handle: JoinHandle<()>) {
        self.tasks.retain(|h| !h.is_finished());
        self.tasks.push(handle);
    }
}

struct Inner<E> {
    source: Arc<dyn DataSource<E>>,
    cache: SharedCache<E>,
    filter: RelevanceFilter<E>,
    options: OrchestratorOptions,
    state: Mutex<State<E>>,
    revision: watch::Sender<u64>,
}

/// Search driver for one picker.
///
/// Dropping it aborts the debounce timer and every task it spawned. Requests
/// already handed to the shared cache keep running and still populate it.
pub struct SearchOrchestrator<E: Entity> {
    inner: Arc<Inner<E>>,
}

impl<E: Entity> SearchOrchestrator<E> {
    pub fn new(
        source: Arc<dyn DataSource<E>>,
        cache: SharedCache<E>,
        filter: RelevanceFilter<E>,
        options: OrchestratorOptions,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                source,
                cache,
                filter,
                options,
                state: Mutex::new(State::new()),
                revision,
            }),
        }
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.inner.options
    }

    pub fn filter(&self) -> &RelevanceFilter<E> {
        &self.inner.filter
    }

    pub fn cache(&self) -> &SharedCache<E> {
        &self.inner.cache
    }

    /// Query the current term right away, skipping the debounce window.
    pub fn start(&self) {
        let inner = Arc::clone(&self.inner);
        let mut state = lock(&self.inner.state);
        state.abort_debounce();
        state.is_refreshing = false;
        let token = state.next_token();
        let term = state.raw_term.clone();

        let handle = tokio::spawn(async move { inner.run_query(token, term).await });
        state.track(handle);
    }

    /// Update the term and (re)start the debounce window.
    ///
    /// Until the window elapses the display is the previous base result
    /// filtered locally for `term`.
    pub fn search(&self, term: &str) {
        let inner = Arc::clone(&self.inner);
        let debounce = self.inner.options.debounce;

        {
            let mut state = lock(&self.inner.state);
            // An error belongs to the term that produced it.
            if normalize_term(&state.raw_term) != normalize_term(term) {
                state.error = None;
            }
            state.raw_term = term.to_string();
            state.abort_debounce();
            // An aborted revalidation never reports back.
            state.is_refreshing = false;
            let token = state.next_token();
            self.inner.refresh_display(&mut state);

            let term = term.to_string();
            state.debounce = Some(tokio::spawn(async move {
                tokio::time::sleep(debounce).await;
                inner.run_query(token, term).await;
            }));
        }

        self.inner.publish();
    }

    /// Drop the pending debounce and ignore any outstanding response.
    pub fn cancel(&self) {
        {
            let mut state = lock(&self.inner.state);
            state.abort_debounce();
            state.next_token();
            state.is_loading = false;
            state.is_refreshing = false;
        }
        self.inner.publish();
    }

    /// Fetch the current term from the network now, ignoring freshness.
    ///
    /// A request for the same query sitting in backoff is retried
    /// immediately instead of starting a second one.
    pub async fn refetch(&self) -> PickerResult<Arc<SearchResult<E>>> {
        let (token, term, handle) = {
            let mut state = lock(&self.inner.state);
            state.abort_debounce();
            let token = state.next_token();
            let term = state.raw_term.clone();
            state.debounced_term = term.clone();
            state.is_loading = true;
            state.error = None;

            let query = self.inner.query_for(&term);
            let handle = self.inner.cache.fetch(
                &self.inner.source,
                &query,
                self.inner.options.retry,
                self.inner.options.timing,
                true,
            );
            (token, term, handle)
        };
        self.inner.publish();

        tracing::debug!(term = %term, "manual refetch");
        match handle.wait().await {
            Ok(result) => {
                self.inner.apply(token, &term, Arc::clone(&result));
                Ok(result)
            }
            Err(failure) => {
                self.inner.fail(
                    token,
                    SearchFailure {
                        error: failure.error.clone(),
                        attempts: failure.attempts,
                        retrying: false,
                    },
                );
                Err(PickerError::Network {
                    attempts: failure.attempts,
                    source: failure.error,
                })
            }
        }
    }

    pub fn snapshot(&self) -> SearchSnapshot<E> {
        let state = lock(&self.inner.state);
        SearchSnapshot {
            items: Arc::clone(&state.display),
            authoritative: state.authoritative,
            raw_term: state.raw_term.clone(),
            debounced_term: state.debounced_term.clone(),
            total: state.base.as_ref().map_or(0, |b| b.total),
            is_loading: state.is_loading,
            is_refreshing: state.is_refreshing,
            error: state.error.clone(),
            revision: *self.inner.revision.borrow(),
        }
    }

    /// Revision counter bumped on every visible state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }
}

impl<E: Entity> Drop for SearchOrchestrator<E> {
    fn drop(&mut self) {
        let mut state = lock(&self.inner.state);
        state.abort_debounce();
        for handle in state.tasks.drain(..) {
            handle.abort();
        }
    }
}

impl<E: Entity> Inner<E> {
    fn query_for(&self, term: &str) -> SearchQuery {
        SearchQuery::new(term, self.options.filters.clone(), self.options.max_results)
    }

    fn publish(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    fn refresh_display(&self, state: &mut State<E>) {
        let Some(base) = state.base.as_ref() else {
            state.display = Vec::new().into();
            state.authoritative = false;
            return;
        };

        // The server already matched the term; only the provisional list is
        // narrowed locally.
        let authoritative = normalize_term(&state.base_term) == normalize_term(&state.raw_term);
        let mut items = if authoritative {
            self.filter.rank(&base.items, &state.raw_term)
        } else {
            self.filter.filter_and_rank(&base.items, &state.raw_term)
        };
        items.truncate(self.options.max_results);
        state.display = items.into();
        state.authoritative = authoritative;
    }

    async fn run_query(self: Arc<Self>, token: u64, term: String) {
        let query = {
            let mut state = lock(&self.state);
            if state.latest_token != token {
                return;
            }
            state.debounced_term = term.clone();
            self.query_for(&term)
        };

        match self.cache.lookup(&query.cache_key(), Instant::now()) {
            CacheLookup::Fresh(result) => {
                tracing::debug!(term = %term, "cache hit");
                self.apply(token, &term, result);
            }
            CacheLookup::Stale(result) => {
                tracing::debug!(term = %term, "serving stale result, revalidating");
                self.apply(token, &term, result);
                self.set_refreshing(token, true);

                let handle = self.fetch(&query);
                match handle.wait().await {
                    Ok(result) => {
                        self.apply(token, &term, result);
                    }
                    Err(failure) => {
                        tracing::warn!(term = %term, error = %failure.error, "background revalidation failed, keeping stale result");
                    }
                }
                self.set_refreshing(token, false);
            }
            CacheLookup::Miss => {
                tracing::debug!(term = %term, "cache miss");
                self.set_loading(token);
                let handle = self.fetch(&query);
                self.await_blocking(token, &term, handle).await;
            }
        }
    }

    fn fetch(&self, query: &SearchQuery) -> InFlight<E> {
        self.cache
            .fetch(&self.source, query, self.options.retry, self.options.timing, false)
    }

    async fn await_blocking(&self, token: u64, term: &str, mut handle: InFlight<E>) {
        loop {
            match handle.progress() {
                FetchProgress::Done(Ok(result)) => {
                    self.apply(token, term, result);
                    return;
                }
                FetchProgress::Done(Err(failure)) => {
                    self.fail(
                        token,
                        SearchFailure {
                            error: failure.error,
                            attempts: failure.attempts,
                            retrying: false,
                        },
                    );
                    return;
                }
                FetchProgress::Pending {
                    attempt,
                    last_error: Some(error),
                    ..
                } => {
                    self.fail(
                        token,
                        SearchFailure {
                            error,
                            attempts: attempt.saturating_sub(1),
                            retrying: true,
                        },
                    );
                }
                FetchProgress::Pending { .. } => {}
            }

            if !handle.changed().await {
                if let FetchProgress::Done(_) = handle.progress() {
                    continue;
                }
                self.fail(
                    token,
                    SearchFailure {
                        error: FetchError::transport("request task ended without a result"),
                        attempts: 0,
                        retrying: false,
                    },
                );
                return;
            }
        }
    }

    /// Install `result` as the base if `token` is still current.
    fn apply(&self, token: u64, term: &str, result: Arc<SearchResult<E>>) -> bool {
        {
            let mut state = lock(&self.state);
            if state.latest_token != token {
                tracing::debug!(term = %term, "discarding superseded response");
                return false;
            }
            state.base = Some(result);
            state.base_term = term.to_string();
            state.is_loading = false;
            state.error = None;
            self.refresh_display(&mut state);
        }
        self.publish();
        true
    }

    /// Record a failure; the displayed items are left untouched.
    fn fail(&self, token: u64, failure: SearchFailure) {
        {
            let mut state = lock(&self.state);
            if state.latest_token != token {
                return;
            }
            if !failure.retrying {
                state.is_loading = false;
            }
            state.error = Some(failure);
        }
        self.publish();
    }

    fn set_loading(&self, token: u64) {
        {
            let mut state = lock(&self.state);
            if state.latest_token != token {
                return;
            }
            state.is_loading = true;
        }
        self.publish();
    }

    fn set_refreshing(&self, token: u64, refreshing: bool) {
        {
            let mut state = lock(&self.state);
            if state.latest_token != token {
                return;
            }
            state.is_refreshing = refreshing;
        }
        self.publish();
    }
}
