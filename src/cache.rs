//! Page cache with next-page prefetch.
//!
//! [`PageCache`] memoizes [`PageResult`]s by `(page, page size, filter)`
//! key so a page/filter combination is fetched at most once, and hides
//! one page
//! of latency by prefetching the page after the one just served in a
//! detached background task.
//!
//! The cache is an explicit instance owned by whoever drives the grid,
//! constructed empty and injected where needed; there is no module-level
//! state. Entries are never evicted for the lifetime of the instance,
//! which is a documented scalability limit for the dataset sizes this
//! targets (a few thousand rows), not a bug.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use crate::{
    dataset::Dataset,
    error::Result,
    query::{query, PageRequest, PageResult},
};

/// The composite key identifying a memoized page.
///
/// The page size is part of the key: a page-size change lands under
/// fresh keys, leaving prior entries as unreachable (harmless) garbage
/// rather than wrong-size hits. Absent filter components are the empty
/// string, and an empty filter value collapses the whole filter:
/// `("name", "")` and no filter at all deliberately share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageCacheKey {
    /// 1-based page number.
    pub page: usize,
    /// Records per page.
    pub page_size: usize,
    /// Filter column, or empty when unfiltered.
    pub filter_column: String,
    /// Filter value, or empty when unfiltered.
    pub filter_value: String,
}

impl PageCacheKey {
    /// Computes the key for a request.
    pub fn for_request(request: &PageRequest) -> Self {
        let (column, value) = match request.filter() {
            Some(filter) if !filter.value.is_empty() => {
                (filter.column.clone(), filter.value.clone())
            }
            _ => (String::new(), String::new()),
        };
        Self {
            page: request.page(),
            page_size: request.page_size(),
            filter_column: column,
            filter_value: value,
        }
    }
}

/// The seam between the cache and whatever produces pages.
///
/// Implementations must be pure with respect to their inputs: two
/// fetches of the same request return the same result, which is what
/// makes racing cache writes to one key benign.
pub trait PageFetcher: Send + Sync {
    /// Produces the page for a request.
    ///
    /// # Errors
    ///
    /// Returns any query or load error; the cache propagates it without
    /// storing anything.
    fn fetch(&self, request: &PageRequest) -> Result<PageResult>;
}

impl<T: PageFetcher + ?Sized> PageFetcher for Arc<T> {
    fn fetch(&self, request: &PageRequest) -> Result<PageResult> {
        (**self).fetch(request)
    }
}

/// A [`PageFetcher`] backed by the in-process query engine.
#[derive(Debug, Clone)]
pub struct DatasetQuery {
    dataset: Arc<Dataset>,
}

impl DatasetQuery {
    /// Creates a fetcher over a shared dataset.
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }
}

impl PageFetcher for DatasetQuery {
    fn fetch(&self, request: &PageRequest) -> Result<PageResult> {
        query(&self.dataset, request)
    }
}

/// Memoizing page cache with background next-page prefetch.
///
/// Cheap to clone and share: clones point at the same entries.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use hojear::{Dataset, DatasetQuery, PageCache, PageRequest};
///
/// let dataset = Arc::new(Dataset::from_json_str(
///     r#"[{"legal_name": "Acme Freight"}]"#,
/// ).unwrap());
/// let cache = PageCache::new(DatasetQuery::new(dataset));
///
/// let request = PageRequest::new(1, 10);
/// let first = cache.fetch_page(&request).unwrap();
/// // Second call is served from the cache
/// let second = cache.fetch_page(&request).unwrap();
/// assert_eq!(first, second);
/// ```
#[derive(Clone)]
pub struct PageCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    fetcher: Box<dyn PageFetcher>,
    entries: Mutex<HashMap<PageCacheKey, PageResult>>,
    total_count: AtomicUsize,
}

impl PageCache {
    /// Creates an empty cache over a fetcher.
    pub fn new(fetcher: impl PageFetcher + 'static) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                fetcher: Box::new(fetcher),
                entries: Mutex::new(HashMap::new()),
                total_count: AtomicUsize::new(0),
            }),
        }
    }

    /// Returns the page for a request, fetching on a cache miss.
    ///
    /// A hit returns the stored result without touching the fetcher. A
    /// miss fetches, stores the result under the request's key, records
    /// the result's `total_count`, and returns it.
    ///
    /// # Errors
    ///
    /// Propagates fetcher errors. Failed fetches are never cached, so a
    /// subsequent call with the same request retries.
    pub fn fetch_page(&self, request: &PageRequest) -> Result<PageResult> {
        self.inner.fetch_into_cache(request)
    }

    /// Schedules a background fetch of the page after `request`, if one
    /// exists and is not already cached.
    ///
    /// The task's only effect is a cache write; its failure is logged
    /// and never surfaced. Returns the task handle so tests and shutdown
    /// paths can await it; interactive callers drop it. A task
    /// superseded by a filter change simply writes an entry under a key
    /// nobody reads again.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[cfg(feature = "tokio-runtime")]
    pub fn prefetch_next(&self, request: &PageRequest) -> Option<tokio::task::JoinHandle<()>> {
        let next = request.next_page();
        let pages = crate::query::total_pages(
            self.inner.total_count.load(Ordering::Relaxed),
            next.page_size(),
        );
        if next.page() > pages {
            return None;
        }
        if self.contains(&next) {
            return None;
        }

        let inner = Arc::clone(&self.inner);
        Some(tokio::spawn(async move {
            if let Err(error) = inner.fetch_into_cache(&next) {
                tracing::warn!(page = next.page(), %error, "background prefetch failed");
            }
        }))
    }

    /// Returns the last `total_count` observed from a successful fetch.
    pub fn total_count(&self) -> usize {
        self.inner.total_count.load(Ordering::Relaxed)
    }

    /// Returns true if the request's key is cached.
    pub fn contains(&self, request: &PageRequest) -> bool {
        self.inner
            .lock_entries()
            .contains_key(&PageCacheKey::for_request(request))
    }

    /// Returns the number of cached pages.
    pub fn len(&self) -> usize {
        self.inner.lock_entries().len()
    }

    /// Returns true if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.inner.lock_entries().is_empty()
    }
}

impl std::fmt::Debug for PageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCache")
            .field("entries", &self.len())
            .field("total_count", &self.total_count())
            .finish()
    }
}

impl CacheInner {
    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<PageCacheKey, PageResult>> {
        // A poisoned lock only means a panic mid-insert; the map itself
        // is still a valid set of idempotent entries.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fetch_into_cache(&self, request: &PageRequest) -> Result<PageResult> {
        let key = PageCacheKey::for_request(request);
        if let Some(hit) = self.lock_entries().get(&key) {
            return Ok(hit.clone());
        }

        // The lock is not held across the fetch; two callers racing on
        // one key both fetch and write the same value, last write wins.
        let result = self.fetcher.fetch(request)?;
        self.total_count.store(result.total_count, Ordering::Relaxed);
        self.lock_entries().insert(key, result.clone());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    /// Fetcher double that counts underlying calls and can be told to
    /// fail for specific pages.
    struct CountingFetcher {
        dataset: Arc<Dataset>,
        calls: AtomicUsize,
        fail_page: Option<usize>,
    }

    impl CountingFetcher {
        fn new(dataset: Arc<Dataset>) -> Self {
            Self {
                dataset,
                calls: AtomicUsize::new(0),
                fail_page: None,
            }
        }

        fn failing_on(dataset: Arc<Dataset>, page: usize) -> Self {
            Self {
                fail_page: Some(page),
                ..Self::new(dataset)
            }
        }
    }

    impl PageFetcher for Arc<CountingFetcher> {
        fn fetch(&self, request: &PageRequest) -> Result<PageResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_page == Some(request.page()) {
                return Err(Error::invalid_request("induced failure"));
            }
            query(&self.dataset, request)
        }
    }

    fn carrier_dataset(rows: usize) -> Arc<Dataset> {
        let body: Vec<String> = (0..rows)
            .map(|i| {
                format!(
                    r#"{{"legal_name": "Carrier {}", "entity_type": "{}"}}"#,
                    i,
                    if i % 2 == 0 { "CARRIER" } else { "BROKER" }
                )
            })
            .collect();
        Arc::new(Dataset::from_json_str(&format!("[{}]", body.join(","))).expect("load"))
    }

    #[test]
    fn test_hit_skips_fetcher() {
        let fetcher = Arc::new(CountingFetcher::new(carrier_dataset(25)));
        let cache = PageCache::new(Arc::clone(&fetcher));

        let request = PageRequest::new(1, 10);
        let first = cache.fetch_page(&request).expect("fetch");
        let second = cache.fetch_page(&request).expect("fetch");

        assert_eq!(first, second);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.total_count(), 25);
    }

    #[test]
    fn test_distinct_filters_are_distinct_keys() {
        let fetcher = Arc::new(CountingFetcher::new(carrier_dataset(25)));
        let cache = PageCache::new(Arc::clone(&fetcher));

        cache.fetch_page(&PageRequest::new(1, 10)).expect("fetch");
        cache
            .fetch_page(&PageRequest::new(1, 10).with_filter("entity_type", "CARRIER"))
            .expect("fetch");

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_page_size_change_is_a_distinct_key() {
        let fetcher = Arc::new(CountingFetcher::new(carrier_dataset(25)));
        let cache = PageCache::new(Arc::clone(&fetcher));

        let ten = cache.fetch_page(&PageRequest::new(1, 10)).expect("fetch");
        assert_eq!(ten.records.len(), 10);

        // Same page at a new size must not hit the 10-record entry
        let five = cache.fetch_page(&PageRequest::new(1, 5)).expect("fetch");
        assert_eq!(five.records.len(), 5);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);

        // The old entry stays reachable under its own key
        assert!(cache.contains(&PageRequest::new(1, 10)));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_empty_filter_collapses_with_no_filter() {
        let fetcher = Arc::new(CountingFetcher::new(carrier_dataset(4)));
        let cache = PageCache::new(Arc::clone(&fetcher));

        let unfiltered = PageRequest::new(1, 10);
        let key_a = PageCacheKey::for_request(&unfiltered);
        let key_b =
            PageCacheKey::for_request(&PageRequest::new(1, 10).with_filter("legal_name", ""));
        // Deliberate collapse: same key, so the second request is a hit
        assert_eq!(key_a, key_b);

        cache.fetch_page(&unfiltered).expect("fetch");
        cache
            .fetch_page(&PageRequest::new(1, 10).with_filter("legal_name", ""))
            .expect("fetch");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let fetcher = Arc::new(CountingFetcher::failing_on(carrier_dataset(25), 1));
        let cache = PageCache::new(Arc::clone(&fetcher));

        let request = PageRequest::new(1, 10);
        assert!(cache.fetch_page(&request).is_err());
        assert!(cache.is_empty());

        // The next call retries the fetch rather than replaying the error
        assert!(cache.fetch_page(&request).is_err());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[cfg(feature = "tokio-runtime")]
    mod prefetch {
        use super::*;

        #[tokio::test]
        async fn test_prefetch_populates_next_page() {
            let fetcher = Arc::new(CountingFetcher::new(carrier_dataset(25)));
            let cache = PageCache::new(Arc::clone(&fetcher));

            let request = PageRequest::new(1, 10);
            cache.fetch_page(&request).expect("fetch");

            let handle = cache.prefetch_next(&request).expect("scheduled");
            handle.await.expect("join");

            assert!(cache.contains(&PageRequest::new(2, 10)));
            // Serving page 2 now touches only the cache
            cache.fetch_page(&PageRequest::new(2, 10)).expect("fetch");
            assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        }

        #[tokio::test]
        async fn test_no_prefetch_past_last_page() {
            let fetcher = Arc::new(CountingFetcher::new(carrier_dataset(25)));
            let cache = PageCache::new(Arc::clone(&fetcher));

            let request = PageRequest::new(3, 10);
            cache.fetch_page(&request).expect("fetch");
            assert!(cache.prefetch_next(&request).is_none());
        }

        #[tokio::test]
        async fn test_no_duplicate_prefetch() {
            let fetcher = Arc::new(CountingFetcher::new(carrier_dataset(25)));
            let cache = PageCache::new(Arc::clone(&fetcher));

            let request = PageRequest::new(1, 10);
            cache.fetch_page(&request).expect("fetch");
            cache.fetch_page(&PageRequest::new(2, 10)).expect("fetch");

            // Page 2 is already cached, nothing to schedule
            assert!(cache.prefetch_next(&request).is_none());
        }

        #[tokio::test]
        async fn test_prefetch_failure_is_swallowed() {
            let fetcher = Arc::new(CountingFetcher::failing_on(carrier_dataset(25), 2));
            let cache = PageCache::new(Arc::clone(&fetcher));

            let request = PageRequest::new(1, 10);
            cache.fetch_page(&request).expect("fetch");

            let handle = cache.prefetch_next(&request).expect("scheduled");
            // The task completes normally; the failure is only logged
            handle.await.expect("join");
            assert!(!cache.contains(&PageRequest::new(2, 10)));
        }

        #[tokio::test]
        async fn test_filter_change_leaves_stale_entries_unreachable() {
            let fetcher = Arc::new(CountingFetcher::new(carrier_dataset(25)));
            let cache = PageCache::new(Arc::clone(&fetcher));

            let unfiltered = PageRequest::new(1, 10);
            cache.fetch_page(&unfiltered).expect("fetch");
            if let Some(handle) = cache.prefetch_next(&unfiltered) {
                handle.await.expect("join");
            }

            let filtered = PageRequest::new(1, 10).with_filter("entity_type", "CARRIER");
            cache.fetch_page(&filtered).expect("fetch");

            // Old unfiltered entries stay under their own keys; no eviction
            assert!(cache.contains(&unfiltered));
            assert!(cache.contains(&PageRequest::new(2, 10)));
            assert!(cache.contains(&filtered));
            assert_eq!(cache.len(), 3);
        }
    }
}
