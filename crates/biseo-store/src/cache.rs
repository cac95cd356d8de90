//! Time-bounded memoisation on top of [`moka`].
//!
//! Used to avoid asking the language model to resolve the same period phrase
//! twice within a short window.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

/// Hit/miss counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Hit rate between 0.0 and 1.0; 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 {
            return 0.0;
        }
        self.hits() as f64 / total as f64
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} rate={:.2}%",
            self.hits(),
            self.misses(),
            self.hit_rate() * 100.0,
        )
    }
}

/// A named, bounded cache whose entries expire `ttl` after insertion.
pub struct TtlCache<V> {
    name: &'static str,
    inner: Cache<String, V>,
    stats: Arc<CacheStats>,
}

impl<V: Clone + Send + Sync + 'static> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            inner: self.inner.clone(),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, max_capacity: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        debug!(
            cache = name,
            max_capacity,
            ttl_secs = ttl.as_secs(),
            "ttl cache created"
        );
        Self {
            name,
            inner,
            stats: Arc::new(CacheStats::default()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        match self.inner.get(key).await {
            Some(value) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                debug!(cache = self.name, key, "cache hit");
                Some(value)
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn insert(&self, key: &str, value: V) {
        self.inner.insert(key.to_string(), value).await;
    }

    /// Return the cached value or compute, cache, and return it.
    ///
    /// Loader errors are returned untouched and nothing is cached.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: &str, loader: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }
        let value = loader().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
