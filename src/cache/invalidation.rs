//! Post-mutation cache invalidation.
//!
//! List reads are parameterized (filters, sort, pagination), so their keys
//! can't be enumerated. A mutation therefore evicts every key of the
//! affected resource family by substring, plus the single-entity key.

use tracing::debug;

use super::key::CacheKey;
use super::storage::CacheStorage;

/// Keys and families to evict after a successful mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invalidation {
  keys: Vec<CacheKey>,
  families: Vec<String>,
}

impl Invalidation {
  pub fn new() -> Self {
    Self::default()
  }

  /// Evict one exact key.
  pub fn key(mut self, key: CacheKey) -> Self {
    self.keys.push(key);
    self
  }

  /// Evict every key containing `family`.
  pub fn family(mut self, family: impl Into<String>) -> Self {
    self.families.push(family.into());
    self
  }

  pub fn is_empty(&self) -> bool {
    self.keys.is_empty() && self.families.is_empty()
  }

  pub fn keys(&self) -> &[CacheKey] {
    &self.keys
  }

  pub fn families(&self) -> &[String] {
    &self.families
  }

  /// Apply to storage. Returns the number of entries removed.
  pub fn apply(&self, storage: &dyn CacheStorage) -> usize {
    let mut removed = 0;
    for key in &self.keys {
      if storage.remove(key) {
        removed += 1;
      }
    }
    for family in &self.families {
      removed += storage.remove_family(family);
    }

    debug!(keys = ?self.keys, families = ?self.families, removed, "Invalidated cache entries");
    removed
  }
}
