use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::AppError;
use crate::provider::FoodPage;

/// Default lifetime of a cached external search page.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct CacheEntry {
    payload: FoodPage,
    stored_at: Instant,
}

/// Process-wide memoization of external catalog pages, keyed by
/// `(query, page)`. Entries expire lazily after the TTL; there is no
/// background sweep and no key bound. Racing writers on the same key
/// overwrite each other, which is harmless here.
pub struct SearchCache {
    ttl: Duration,
    entries: RwLock<HashMap<(String, u32), CacheEntry>>,
    clock: Box<dyn Fn() -> Instant + Send + Sync>,
}

impl SearchCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Instant::now)
    }

    /// Clock injection point for tests.
    pub fn with_clock(ttl: Duration, clock: impl Fn() -> Instant + Send + Sync + 'static) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            clock: Box::new(clock),
        }
    }

    /// Return the cached page for `(query, page)` if still fresh, otherwise
    /// run `fetch`, store its result and return it. Fetch errors are
    /// propagated and never cached. Concurrent misses on the same key may
    /// each invoke `fetch`; no single-flight.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        query: &str,
        page: u32,
        fetch: F,
    ) -> Result<FoodPage, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<FoodPage, AppError>>,
    {
        let key = (query.to_string(), page);
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&key) {
                if (self.clock)().duration_since(entry.stored_at) < self.ttl {
                    debug!(query, page, "search cache hit");
                    return Ok(entry.payload.clone());
                }
            }
        }

        let payload = fetch().await?;
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheEntry {
                payload: payload.clone(),
                stored_at: (self.clock)(),
            },
        );
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn page(count: u64) -> FoodPage {
        FoodPage {
            records: vec![],
            page: 1,
            total_pages: 1,
            total_count: count,
        }
    }

    #[tokio::test]
    async fn second_call_within_ttl_hits_cache() {
        let cache = SearchCache::new(DEFAULT_TTL);
        let calls = Arc::new(AtomicU64::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            let got = cache
                .get_or_fetch("nutella", 1, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(page(7))
                })
                .await
                .unwrap();
            assert_eq!(got.total_count, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_refetches() {
        // Clock that jumps one TTL forward on every read.
        let base = Instant::now();
        let ticks = Arc::new(AtomicU64::new(0));
        let clock_ticks = Arc::clone(&ticks);
        let cache = SearchCache::with_clock(Duration::from_secs(300), move || {
            base + Duration::from_secs(301 * clock_ticks.fetch_add(1, Ordering::SeqCst))
        });

        let calls = Arc::new(AtomicU64::new(0));
        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            cache
                .get_or_fetch("bread", 1, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(page(1))
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn distinct_pages_are_distinct_keys() {
        let cache = SearchCache::new(DEFAULT_TTL);
        let calls = Arc::new(AtomicU64::new(0));

        for p in [1u32, 2, 1] {
            let calls = Arc::clone(&calls);
            cache
                .get_or_fetch("rice", p, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(page(u64::from(p)))
                })
                .await
                .unwrap();
        }
        // Page 1 cached, page 2 fetched separately.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = SearchCache::new(DEFAULT_TTL);
        let err = cache
            .get_or_fetch("soup", 1, || async {
                Err(AppError::ProviderUnavailable("down".into()))
            })
            .await;
        assert!(err.is_err());

        let got = cache
            .get_or_fetch("soup", 1, || async { Ok(page(3)) })
            .await
            .unwrap();
        assert_eq!(got.total_count, 3);
    }
}
