//! Content-addressed docstring cache using moka
//!
//! Stored docstrings never change under a given id, so entries only need
//! invalidation when a node is removed.

use moka::future::Cache;
use spectree_docstring::{ContentHash, Docstring};
use std::future::Future;

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// Read-through cache of stored docstrings keyed by id
#[derive(Debug, Clone)]
pub struct TextCache {
    inner: Cache<ContentHash, Docstring>,
}

impl TextCache {
    /// Create new cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Insert docstring under its own id
    #[inline]
    pub async fn insert(&self, docstring: Docstring) {
        self.inner.insert(docstring.id(), docstring).await;
    }

    /// Get docstring from cache
    #[inline]
    pub async fn get(&self, id: &ContentHash) -> Option<Docstring> {
        self.inner.get(id).await
    }

    /// Return the cached docstring or load and cache it
    pub async fn try_get_or_load<E, F, Fut>(&self, id: ContentHash, load: F) -> Result<Docstring, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Docstring, E>>,
    {
        if let Some(cached) = self.get(&id).await {
            return Ok(cached);
        }

        let docstring = load().await?;
        self.inner.insert(id, docstring.clone()).await;

        Ok(docstring)
    }

    /// Invalidate cache entry
    #[inline]
    pub async fn invalidate(&self, id: &ContentHash) {
        self.inner.invalidate(id).await;
    }

    /// Get cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }
}

impl Default for TextCache {
    /// Create cache with default capacity (10,000 entries)
    fn default() -> Self {
        Self::new(10_000)
    }
}
