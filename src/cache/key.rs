//! Cache keys.

use std::borrow::Borrow;
use std::fmt;

use crate::api::QueryParams;

/// Normalized signature of a cached read.
///
/// Built from a resource-shaped scope (`member_journeys`, `task_42`, ...)
/// followed by the sorted, encoded query parameters. Every scope starts with
/// its resource family name, which is what family invalidation matches on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
  pub fn new(scope: &str, params: &QueryParams) -> Self {
    if params.is_empty() {
      Self(scope.to_string())
    } else {
      Self(format!("{}?{}", scope, params.normalized()))
    }
  }

  /// Key for a single entity: `<family>_<id>`.
  pub fn entity(family: &str, id: impl fmt::Display) -> Self {
    Self(format!("{}_{}", family, id))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Whether this key belongs to the given resource family.
  pub fn in_family(&self, family: &str) -> bool {
    self.0.contains(family)
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl AsRef<str> for CacheKey {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

impl Borrow<str> for CacheKey {
  fn borrow(&self) -> &str {
    &self.0
  }
}
