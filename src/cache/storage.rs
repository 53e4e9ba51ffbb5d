//! Cache storage trait and in-memory TTL implementation.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use super::key::CacheKey;

/// Default TTL for list and detail reads: 30 seconds.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// TTL for aggregate statistics reads: 60 seconds.
pub const STATS_TTL: Duration = Duration::from_secs(60);

/// A single cached response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub key: CacheKey,
  /// Decoded JSON document
  pub data: Value,
  pub stored_at: Instant,
  pub ttl: Duration,
}

impl CacheEntry {
  pub fn new(key: CacheKey, data: Value, ttl: Duration) -> Self {
    Self {
      key,
      data,
      stored_at: Instant::now(),
      ttl,
    }
  }

  /// Fresh while strictly younger than its TTL.
  pub fn is_fresh_at(&self, now: Instant) -> bool {
    now.saturating_duration_since(self.stored_at) < self.ttl
  }

  pub fn is_fresh(&self) -> bool {
    self.is_fresh_at(Instant::now())
  }
}

/// Trait for cache storage backends.
///
/// Every operation is synchronous; implementations must never hold a lock
/// across an await point, which keeps each call atomic relative to the others.
pub trait CacheStorage: Send + Sync {
  /// Fresh data for the key, or None on a miss.
  fn get(&self, key: &CacheKey) -> Option<Value>;

  /// Store data, replacing any existing entry.
  fn set(&self, key: &CacheKey, data: Value, ttl: Duration);

  /// Remove a single key. Returns whether an entry was removed.
  fn remove(&self, key: &CacheKey) -> bool;

  /// Remove every entry whose key matches. Returns the number removed.
  fn remove_where(&self, predicate: &dyn Fn(&CacheKey) -> bool) -> usize;

  fn clear(&self);

  /// Number of stored entries, stale ones included.
  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Remove every key containing the family substring.
  fn remove_family(&self, family: &str) -> usize {
    self.remove_where(&|key| key.in_family(family))
  }
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _key: &CacheKey) -> Option<Value> {
    None // Always miss
  }

  fn set(&self, _key: &CacheKey, _data: Value, _ttl: Duration) {}

  fn remove(&self, _key: &CacheKey) -> bool {
    false
  }

  fn remove_where(&self, _predicate: &dyn Fn(&CacheKey) -> bool) -> usize {
    0
  }

  fn clear(&self) {}

  fn len(&self) -> usize {
    0
  }
}

/// Process-lifetime in-memory response cache.
///
/// Expiry is lazy: a stale entry is dropped when it is next read.
#[derive(Debug, Default)]
pub struct ResponseCache {
  entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl ResponseCache {
  pub fn new() -> Self {
    Self::default()
  }

  fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
    // A panic mid-operation cannot leave a half-written entry behind
    self.entries.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Keys currently stored, stale ones included.
  pub fn keys(&self) -> Vec<CacheKey> {
    let mut keys: Vec<CacheKey> = self.entries().keys().cloned().collect();
    keys.sort();
    keys
  }
}

impl CacheStorage for ResponseCache {
  fn get(&self, key: &CacheKey) -> Option<Value> {
    let mut entries = self.entries();
    match entries.get(key) {
      Some(entry) if entry.is_fresh() => Some(entry.data.clone()),
      Some(_) => {
        entries.remove(key);
        None
      }
      None => None,
    }
  }

  fn set(&self, key: &CacheKey, data: Value, ttl: Duration) {
    self
      .entries()
      .insert(key.clone(), CacheEntry::new(key.clone(), data, ttl));
  }

  fn remove(&self, key: &CacheKey) -> bool {
    self.entries().remove(key).is_some()
  }

  fn remove_where(&self, predicate: &dyn Fn(&CacheKey) -> bool) -> usize {
    let mut entries = self.entries();
    let before = entries.len();
    entries.retain(|key, _| !predicate(key));
    before - entries.len()
  }

  fn clear(&self) {
    self.entries().clear();
  }

  fn len(&self) -> usize {
    self.entries().len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::QueryParams;
  use serde_json::json;

  fn key(scope: &str) -> CacheKey {
    CacheKey::new(scope, &QueryParams::new())
  }

  #[tokio::test(start_paused = true)]
  async fn test_fresh_until_ttl() {
    let cache = ResponseCache::new();
    cache.set(&key("tasks"), json!([1, 2, 3]), DEFAULT_TTL);

    tokio::time::advance(Duration::from_millis(29_999)).await;
    assert_eq!(cache.get(&key("tasks")), Some(json!([1, 2, 3])));

    tokio::time::advance(Duration::from_millis(2)).await;
    assert_eq!(cache.get(&key("tasks")), None);
    // Lazily dropped on the read that found it stale
    assert!(cache.is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn test_exactly_ttl_is_stale() {
    let cache = ResponseCache::new();
    cache.set(&key("task_stats"), json!({ "total": 4 }), STATS_TTL);

    tokio::time::advance(STATS_TTL).await;
    assert_eq!(cache.get(&key("task_stats")), None);
  }

  #[tokio::test(start_paused = true)]
  async fn test_set_overwrites_and_restarts_clock() {
    let cache = ResponseCache::new();
    cache.set(&key("task_7"), json!({ "v": 1 }), DEFAULT_TTL);

    tokio::time::advance(Duration::from_secs(20)).await;
    cache.set(&key("task_7"), json!({ "v": 2 }), DEFAULT_TTL);

    tokio::time::advance(Duration::from_secs(20)).await;
    assert_eq!(cache.get(&key("task_7")), Some(json!({ "v": 2 })));
    assert_eq!(cache.len(), 1);
  }

  #[test]
  fn test_remove_family_keeps_other_families() {
    let cache = ResponseCache::new();
    cache.set(&key("member_journeys?status=paused"), json!([]), DEFAULT_TTL);
    cache.set(&key("member_journey_4"), json!({}), DEFAULT_TTL);
    cache.set(&key("member_journey_stats"), json!({}), STATS_TTL);
    cache.set(&key("milestone_progress_4"), json!([]), DEFAULT_TTL);

    assert_eq!(cache.remove_family("member_journey"), 3);
    assert_eq!(cache.keys(), vec![key("milestone_progress_4")]);
  }

  #[test]
  fn test_remove_and_clear() {
    let cache = ResponseCache::new();
    cache.set(&key("a"), json!(1), DEFAULT_TTL);
    cache.set(&key("b"), json!(2), DEFAULT_TTL);

    assert!(cache.remove(&key("a")));
    assert!(!cache.remove(&key("a")));

    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.get(&key("b")), None);
  }

  #[test]
  fn test_noop_storage_never_hits() {
    let storage = NoopStorage;
    storage.set(&key("tasks"), json!([]), DEFAULT_TTL);

    assert_eq!(storage.get(&key("tasks")), None);
    assert!(storage.is_empty());
  }
}
