//! Query, page and result types exchanged with a data source.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::time::Instant;

use crate::error::FetchError;

/// Server-side filters sent along with the term (e.g. `status=active`).
///
/// A `BTreeMap` keeps iteration order deterministic, which the cache key
/// relies on.
pub type FilterSet = BTreeMap<String, String>;

/// A query as issued to a data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    pub term: String,
    pub filters: FilterSet,
    pub limit: usize,
}

impl SearchQuery {
    pub fn new(term: impl Into<String>, filters: FilterSet, limit: usize) -> Self {
        Self {
            term: term.into(),
            filters,
            limit,
        }
    }

    /// Normalized key used for cache lookups and request dedup.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            term: normalize_term(&self.term),
            filters: self.filters.clone(),
            limit: self.limit,
        }
    }
}

/// Trim and lowercase a search term.
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// Normalized form of a [`SearchQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub term: String,
    pub filters: FilterSet,
    pub limit: usize,
}

/// One page of items as returned by a data source.
#[derive(Debug, Clone)]
pub struct Page<E> {
    pub items: Vec<E>,
    pub total: usize,
}

impl<E> Page<E> {
    pub fn new(items: Vec<E>) -> Self {
        let total = items.len();
        Self { items, total }
    }

    pub fn with_total(items: Vec<E>, total: usize) -> Self {
        Self { items, total }
    }
}

/// A page stamped with the time it was fetched.
#[derive(Debug, Clone)]
pub struct SearchResult<E> {
    pub items: Arc<[E]>,
    pub total: usize,
    pub fetched_at: Instant,
}

impl<E> SearchResult<E> {
    pub fn from_page(page: Page<E>, fetched_at: Instant) -> Self {
        Self {
            items: page.items.into(),
            total: page.total,
            fetched_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Boxed future returned by [`DataSource::fetch_page`].
pub type FetchFuture<E> = Pin<Box<dyn Future<Output = Result<Page<E>, FetchError>> + Send + 'static>>;

/// The only network dependency of the picker: fetch one page for a query.
///
/// Implementations own their timeouts and report them as
/// [`FetchError::Timeout`]; the orchestrator retries every error kind the
/// same way.
pub trait DataSource<E>: Send + Sync + 'static {
    fn fetch_page(&self, query: SearchQuery) -> FetchFuture<E>;
}

impl<E, F, Fut> DataSource<E> for F
where
    F: Fn(SearchQuery) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Page<E>, FetchError>> + Send + 'static,
{
    fn fetch_page(&self, query: SearchQuery) -> FetchFuture<E> {
        Box::pin(self(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_normalizes_term() {
        let a = SearchQuery::new("  Acme ", FilterSet::new(), 100);
        let b = SearchQuery::new("acme", FilterSet::new(), 100);
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key().term, "acme");
    }

    #[test]
    fn test_cache_key_distinguishes_filters_and_limit() {
        let mut filters = FilterSet::new();
        filters.insert("status".into(), "active".into());

        let plain = SearchQuery::new("acme", FilterSet::new(), 100).cache_key();
        let filtered = SearchQuery::new("acme", filters, 100).cache_key();
        let limited = SearchQuery::new("acme", FilterSet::new(), 10).cache_key();

        assert_ne!(plain, filtered);
        assert_ne!(plain, limited);
    }

    #[tokio::test]
    async fn test_closure_is_a_data_source() {
        let source = |query: SearchQuery| async move {
            Ok::<_, FetchError>(Page::new(vec![query.term.clone()]))
        };
        let page = source
            .fetch_page(SearchQuery::new("abc", FilterSet::new(), 5))
            .await
            .unwrap();
        assert_eq!(page.items, vec!["abc".to_string()]);
        assert_eq!(page.total, 1);
    }
}
