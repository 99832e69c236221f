//! Time-based cache for the template catalog.
//!
//! Holds the last successful fetch and when it happened. A read inside the
//! TTL window returns the cached `Arc` without touching the network; a read
//! after expiry refetches once. A failed refetch leaves the previous value in
//! place and the error goes to the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::{TemplateCatalog, TemplateSource};
use crate::error::MemeError;

/// Default catalog lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Monotonic time source, injectable for TTL tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct Cached {
    catalog: Arc<TemplateCatalog>,
    fetched_at: Instant,
}

/// Shared catalog cache: `(value, fetched_at)` behind a lock, swapped whole.
pub struct CatalogCache {
    source: Box<dyn TemplateSource>,
    clock: Box<dyn Clock>,
    ttl: Duration,
    entry: RwLock<Option<Cached>>,
}

impl CatalogCache {
    pub fn new(source: impl TemplateSource + 'static, ttl: Duration) -> Self {
        Self::with_clock(source, ttl, SystemClock)
    }

    pub fn with_clock(
        source: impl TemplateSource + 'static,
        ttl: Duration,
        clock: impl Clock + 'static,
    ) -> Self {
        Self {
            source: Box::new(source),
            clock: Box::new(clock),
            ttl,
            entry: RwLock::new(None),
        }
    }

    /// Current catalog, fetching it if the cache is empty or expired.
    ///
    /// An empty template list counts as a failed fetch, since there is
    /// nothing to match against.
    pub async fn get_templates(&self) -> Result<Arc<TemplateCatalog>, MemeError> {
        {
            let entry = self.entry.read().await;
            if let Some(cached) = entry.as_ref() {
                if self.is_fresh(cached) {
                    tracing::debug!(templates = cached.catalog.len(), "catalog cache hit");
                    return Ok(cached.catalog.clone());
                }
            }
        }

        let mut entry = self.entry.write().await;
        // Another caller may have refreshed while we waited for the write lock
        if let Some(cached) = entry.as_ref() {
            if self.is_fresh(cached) {
                return Ok(cached.catalog.clone());
            }
        }

        let templates = match self.source.fetch().await {
            Ok(templates) if templates.is_empty() => {
                tracing::warn!("catalog fetch returned no templates");
                return Err(MemeError::Catalog("Catalog is empty".to_string()));
            }
            Ok(templates) => templates,
            Err(e) => {
                tracing::warn!(error = %e, "catalog fetch failed");
                return Err(e);
            }
        };

        let catalog = Arc::new(TemplateCatalog::new(templates));
        tracing::info!(templates = catalog.len(), "catalog refreshed");
        *entry = Some(Cached {
            catalog: catalog.clone(),
            fetched_at: self.clock.now(),
        });
        Ok(catalog)
    }

    /// Drop the cached value so the next read refetches.
    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }

    fn is_fresh(&self, cached: &Cached) -> bool {
        self.clock.now().saturating_duration_since(cached.fetched_at) < self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Template;
    use crate::catalog::tests::template;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: Arc<AtomicUsize>,
        fail: Arc<std::sync::atomic::AtomicBool>,
    }

    #[async_trait]
    impl TemplateSource for CountingSource {
        async fn fetch(&self) -> Result<Vec<Template>, MemeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(MemeError::Catalog("offline".to_string()));
            }
            Ok(vec![template("1", "One", 2)])
        }
    }

    #[derive(Clone)]
    struct ManualClock(Arc<Mutex<Instant>>);

    impl ManualClock {
        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.0.lock().unwrap()
        }
    }

    fn setup() -> (CatalogCache, Arc<AtomicUsize>, Arc<std::sync::atomic::AtomicBool>, ManualClock) {
        let calls = Arc::new(AtomicUsize::new(0));
        let fail = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let clock = ManualClock(Arc::new(Mutex::new(Instant::now())));
        let cache = CatalogCache::with_clock(
            CountingSource {
                calls: calls.clone(),
                fail: fail.clone(),
            },
            DEFAULT_TTL,
            clock.clone(),
        );
        (cache, calls, fail, clock)
    }

    #[tokio::test]
    async fn test_reads_within_ttl_share_one_fetch() {
        let (cache, calls, _, clock) = setup();
        let first = cache.get_templates().await.unwrap();
        clock.advance(Duration::from_secs(30 * 60));
        let second = cache.get_templates().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expiry_triggers_one_refetch() {
        let (cache, calls, _, clock) = setup();
        let first = cache.get_templates().await.unwrap();
        clock.advance(DEFAULT_TTL + Duration::from_secs(1));
        let refreshed = cache.get_templates().await.unwrap();
        let again = cache.get_templates().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &refreshed));
        assert!(Arc::ptr_eq(&refreshed, &again));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_previous_value() {
        let (cache, calls, fail, clock) = setup();
        let first = cache.get_templates().await.unwrap();
        clock.advance(DEFAULT_TTL);
        fail.store(true, Ordering::SeqCst);
        assert!(matches!(
            cache.get_templates().await,
            Err(MemeError::Catalog(_))
        ));
        // Previous entry is still there, just stale; a later success replaces it
        fail.store(false, Ordering::SeqCst);
        let next = cache.get_templates().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &next));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let (cache, calls, _, _) = setup();
        cache.get_templates().await.unwrap();
        cache.invalidate().await;
        cache.get_templates().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
