//! Cache layer that orchestrates caching logic with network fetching.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use crate::error::Result;

use super::invalidation::Invalidation;
use super::storage::{CacheStorage, ResponseCache};
use super::traits::{CacheResult, QueryKey};

/// Cache layer that manages caching logic and network fetching.
///
/// This layer sits between the facades and the request executor. Reads go
/// cache-first; mutations evict related keys once they succeed.
pub struct CacheLayer {
  storage: Arc<dyn CacheStorage>,
}

impl CacheLayer {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
    Self { storage }
  }

  pub fn in_memory() -> Self {
    Self::new(Arc::new(ResponseCache::new()))
  }

  pub fn storage(&self) -> &dyn CacheStorage {
    self.storage.as_ref()
  }

  /// Fetch with cache-first strategy.
  ///
  /// 1. Check cache - if fresh, return immediately
  /// 2. On a miss, fetch from network
  /// 3. Decode, then store the raw document with the call-site TTL
  ///
  /// Nothing is stored when the fetch or the decode fails.
  pub async fn fetch<T, K, F, Fut>(
    &self,
    key: &K,
    ttl: Duration,
    fetcher: F,
  ) -> Result<CacheResult<T>>
  where
    T: DeserializeOwned,
    K: QueryKey,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Value>>,
  {
    let cache_key = key.cache_key();

    if let Some(cached) = self.storage.get(&cache_key) {
      trace!(key = %cache_key, "Cache hit for {}", key.description());
      return Ok(CacheResult::from_cache(serde_json::from_value(cached)?));
    }

    trace!(key = %cache_key, "Cache miss for {}", key.description());
    let value = fetcher().await?;
    let data = T::deserialize(&value)?;
    self.storage.set(&cache_key, value, ttl);

    Ok(CacheResult::from_network(data))
  }

  /// Run a mutation and apply the invalidation only if it succeeded.
  pub async fn mutate<T, F, Fut>(&self, invalidation: &Invalidation, mutation: F) -> Result<T>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let output = mutation().await?;
    invalidation.apply(self.storage.as_ref());
    Ok(output)
  }

  /// Drop every cached entry (logout).
  pub fn clear(&self) {
    self.storage.clear();
  }
}

impl Clone for CacheLayer {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
    }
  }
}
