//! Entry point that wires the executor, the shared cache and the facades.

use std::sync::Arc;
use std::time::Duration;

use crate::api::RequestExecutor;
use crate::auth::{TokenSource, TokenStore};
use crate::cache::{CacheLayer, CacheStorage, NoopStorage, ResponseCache, DEFAULT_TTL, STATS_TTL};
use crate::config::Config;
use crate::error::Result;
use crate::journeys::JourneyService;
use crate::tasks::TaskService;

/// Per-call-site cache lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
  /// Lists, details, comments and milestone progress
  pub default: Duration,
  /// Aggregate statistics and templates
  pub stats: Duration,
}

impl Default for TtlPolicy {
  fn default() -> Self {
    Self {
      default: DEFAULT_TTL,
      stats: STATS_TTL,
    }
  }
}

/// Client for the member-management backend.
///
/// Both facades share one executor and one cache, so a task mutation never
/// leaves a journey read stale and [`Flock::clear_cache`] covers everything.
#[derive(Clone)]
pub struct Flock {
  cache: CacheLayer,
  journeys: JourneyService,
  tasks: TaskService,
}

impl Flock {
  pub fn new(config: &Config, tokens: Arc<dyn TokenSource>) -> Result<Self> {
    let storage: Arc<dyn CacheStorage> = if config.cache.enabled {
      Arc::new(ResponseCache::new())
    } else {
      Arc::new(NoopStorage)
    };
    let ttl = TtlPolicy {
      default: config.cache.default_ttl(),
      stats: config.cache.stats_ttl(),
    };
    let executor = RequestExecutor::new(&config.api.base_url, tokens, config.retry.policy())?;

    Ok(Self::with_storage(executor, storage, ttl))
  }

  /// Build from parts, e.g. with a custom storage backend.
  pub fn with_storage(
    executor: RequestExecutor,
    storage: Arc<dyn CacheStorage>,
    ttl: TtlPolicy,
  ) -> Self {
    let executor = Arc::new(executor);
    let cache = CacheLayer::new(storage);

    Self {
      journeys: JourneyService::new(executor.clone(), cache.clone(), ttl),
      tasks: TaskService::new(executor, cache.clone(), ttl),
      cache,
    }
  }

  pub fn journeys(&self) -> &JourneyService {
    &self.journeys
  }

  pub fn tasks(&self) -> &TaskService {
    &self.tasks
  }

  pub fn cache(&self) -> &CacheLayer {
    &self.cache
  }

  /// Drop every cached response. Call on logout.
  pub fn clear_cache(&self) {
    self.cache.clear();
  }

  /// Forget the persisted token and every response read with it.
  pub fn logout(&self, store: &TokenStore) -> Result<()> {
    store.clear()?;
    self.clear_cache();
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::RetryPolicy;
  use crate::auth::StaticToken;
  use crate::journeys::JourneyFilters;
  use crate::tasks::TaskFilters;
  use httpmock::MockServer;
  use serde_json::json;
  use tempfile::TempDir;

  fn config(base_url: &str, cache_enabled: bool) -> Config {
    let mut config = Config::parse(&format!("api:\n  base_url: {}\n", base_url)).unwrap();
    config.cache.enabled = cache_enabled;
    config.retry.backoff_ms = 1;
    config
  }

  async fn mock_lists(server: &MockServer) -> (httpmock::Mock<'_>, httpmock::Mock<'_>) {
    let journeys = server
      .mock_async(|when, then| {
        when.method("GET").path("/api/member-journeys");
        then.status(200).json_body(json!({ "journeys": [], "total": 0 }));
      })
      .await;
    let tasks = server
      .mock_async(|when, then| {
        when.method("GET").path("/api/tasks");
        then.status(200).json_body(json!({ "tasks": [], "total": 0 }));
      })
      .await;
    (journeys, tasks)
  }

  #[tokio::test]
  async fn test_clear_cache_forces_refetch() {
    let server = MockServer::start_async().await;
    let (journeys, tasks) = mock_lists(&server).await;

    let flock = Flock::new(
      &config(&server.base_url(), true),
      Arc::new(StaticToken::new("t")),
    )
    .unwrap();

    flock.journeys().list(&JourneyFilters::default()).await.unwrap();
    flock.tasks().list(&TaskFilters::default()).await.unwrap();
    assert_eq!(flock.cache().storage().len(), 2);

    flock.clear_cache();
    assert!(flock.cache().storage().is_empty());

    flock.journeys().list(&JourneyFilters::default()).await.unwrap();
    flock.tasks().list(&TaskFilters::default()).await.unwrap();
    journeys.assert_calls_async(2).await;
    tasks.assert_calls_async(2).await;
  }

  #[tokio::test]
  async fn test_disabled_cache_always_fetches() {
    let server = MockServer::start_async().await;
    let (journeys, _) = mock_lists(&server).await;

    let flock = Flock::new(
      &config(&server.base_url(), false),
      Arc::new(StaticToken::none()),
    )
    .unwrap();

    flock.journeys().list(&JourneyFilters::default()).await.unwrap();
    flock.journeys().list(&JourneyFilters::default()).await.unwrap();
    journeys.assert_calls_async(2).await;
  }

  #[tokio::test]
  async fn test_task_mutation_keeps_journey_cache() {
    let server = MockServer::start_async().await;
    let (journeys, _) = mock_lists(&server).await;
    server
      .mock_async(|when, then| {
        when.method("DELETE").path("/api/tasks/1");
        then.status(204);
      })
      .await;

    let executor = RequestExecutor::new(
      &server.base_url(),
      Arc::new(StaticToken::new("t")),
      RetryPolicy::default(),
    )
    .unwrap();
    let flock = Flock::with_storage(executor, Arc::new(ResponseCache::new()), TtlPolicy::default());

    flock.journeys().list(&JourneyFilters::default()).await.unwrap();
    flock.tasks().remove(1).await.unwrap();
    flock.journeys().list(&JourneyFilters::default()).await.unwrap();

    journeys.assert_calls_async(1).await;
  }

  #[tokio::test]
  async fn test_logout_drops_token_and_cache() {
    let server = MockServer::start_async().await;
    let authed = server
      .mock_async(|when, then| {
        when
          .method("GET")
          .path("/api/tasks")
          .header("authorization", "Bearer elder-token");
        then.status(200).json_body(json!({ "tasks": [], "total": 0 }));
      })
      .await;
    let anonymous = server
      .mock_async(|when, then| {
        when.method("GET").path("/api/tasks").header_missing("authorization");
        then.status(401).json_body(json!({ "message": "Not signed in" }));
      })
      .await;

    let dir = TempDir::new().unwrap();
    let store = TokenStore::new(dir.path().join("token"));
    store.save("elder-token").unwrap();

    let flock = Flock::new(&config(&server.base_url(), true), Arc::new(store.clone())).unwrap();
    flock.tasks().list(&TaskFilters::default()).await.unwrap();

    flock.logout(&store).unwrap();
    assert!(flock.cache().storage().is_empty());

    let err = flock.tasks().list(&TaskFilters::default()).await.unwrap_err();
    assert_eq!(err.to_string(), "Not signed in (HTTP 401 Unauthorized)");
    authed.assert_calls_async(1).await;
    anonymous.assert_calls_async(3).await;
  }

  #[test]
  fn test_ttl_policy_from_config() {
    let mut config = config("http://localhost", true);
    config.cache.stats_ttl_secs = 300;

    let flock = Flock::new(&config, Arc::new(StaticToken::none())).unwrap();
    assert_eq!(flock.journeys.ttl().stats, Duration::from_secs(300));
    assert_eq!(TtlPolicy::default().default, Duration::from_secs(30));
  }
}
