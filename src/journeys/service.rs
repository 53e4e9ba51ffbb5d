//! Member journey facade with transparent caching.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::api::{
  Blob, BulkResult, ExportFormat, Page, QueryParams, RequestDescriptor, RequestExecutor,
};
use crate::cache::{CacheLayer, Invalidation, QueryKey};
use crate::error::Result;
use crate::TtlPolicy;

use super::cache::{journey_changed, milestone_changed, JourneyQueryKey};
use super::types::{
  BulkStatusRequest, JourneyFilters, JourneyListResponse, JourneyStats, JourneyStatus,
  JourneyTemplate, JourneyUpdate, MemberJourney, MilestoneListResponse, MilestoneProgress,
  MilestoneSubmission, MilestoneUpdate, NewJourney, TemplateListResponse,
};

const JOURNEYS: &str = "/api/member-journeys";
const TEMPLATES: &str = "/api/journey-templates";

/// Journey API with cached reads and invalidating writes.
#[derive(Clone)]
pub struct JourneyService {
  executor: Arc<RequestExecutor>,
  cache: CacheLayer,
  ttl: TtlPolicy,
}

impl JourneyService {
  pub fn new(executor: Arc<RequestExecutor>, cache: CacheLayer, ttl: TtlPolicy) -> Self {
    Self {
      executor,
      cache,
      ttl,
    }
  }

  pub fn ttl(&self) -> TtlPolicy {
    self.ttl
  }

  /// List journeys matching the filters.
  pub async fn list(&self, filters: &JourneyFilters) -> Result<Page<MemberJourney>> {
    let query = filters.to_query();
    let request = RequestDescriptor::get(JOURNEYS).with_query(query.clone());

    let result = self
      .cache
      .fetch::<JourneyListResponse, _, _, _>(
        &JourneyQueryKey::List { query },
        self.ttl.default,
        || self.executor.json(&request),
      )
      .await?;

    Ok(result.data.into())
  }

  /// Get a single journey by id.
  pub async fn get_by_id(&self, id: u64) -> Result<MemberJourney> {
    let request = RequestDescriptor::get(format!("{}/{}", JOURNEYS, id));
    self
      .read(&JourneyQueryKey::Detail { id }, self.ttl.default, &request)
      .await
  }

  /// Aggregate statistics (longer TTL).
  pub async fn stats(&self, filters: &JourneyFilters) -> Result<JourneyStats> {
    let query = filters.to_query();
    let request = RequestDescriptor::get(format!("{}/stats", JOURNEYS)).with_query(query.clone());
    self
      .read(&JourneyQueryKey::Stats { query }, self.ttl.stats, &request)
      .await
  }

  pub async fn milestone_progress(&self, journey_id: u64) -> Result<Vec<MilestoneProgress>> {
    let request = RequestDescriptor::get(format!("{}/{}/milestones", JOURNEYS, journey_id));
    let response: MilestoneListResponse = self
      .read(
        &JourneyQueryKey::Milestones { journey_id },
        self.ttl.default,
        &request,
      )
      .await?;
    Ok(response.milestones)
  }

  /// Templates change rarely and share the stats TTL.
  pub async fn templates(&self) -> Result<Vec<JourneyTemplate>> {
    let request = RequestDescriptor::get(TEMPLATES);
    let response: TemplateListResponse = self
      .read(&JourneyQueryKey::Templates, self.ttl.stats, &request)
      .await?;
    Ok(response.templates)
  }

  pub async fn template(&self, id: u64) -> Result<JourneyTemplate> {
    let request = RequestDescriptor::get(format!("{}/{}", TEMPLATES, id));
    self
      .read(&JourneyQueryKey::Template { id }, self.ttl.stats, &request)
      .await
  }

  pub async fn create(&self, journey: &NewJourney) -> Result<MemberJourney> {
    let request = RequestDescriptor::post(JOURNEYS).json(serde_json::to_value(journey)?);
    let created: MemberJourney = self.write(&journey_changed(None), &request).await?;
    info!(id = created.id, member_id = created.member_id, "Created journey");
    Ok(created)
  }

  pub async fn update(&self, id: u64, update: &JourneyUpdate) -> Result<MemberJourney> {
    let request =
      RequestDescriptor::put(format!("{}/{}", JOURNEYS, id)).json(serde_json::to_value(update)?);
    self.write(&journey_changed(Some(id)), &request).await
  }

  pub async fn remove(&self, id: u64) -> Result<()> {
    let request = RequestDescriptor::delete(format!("{}/{}", JOURNEYS, id));
    let plan =
      journey_changed(Some(id)).key(JourneyQueryKey::Milestones { journey_id: id }.cache_key());
    self
      .cache
      .mutate(&plan, || self.executor.json(&request))
      .await?;
    info!(id, "Deleted journey");
    Ok(())
  }

  /// Move several journeys to the same status in one call.
  pub async fn bulk_update_status(&self, ids: &[u64], status: JourneyStatus) -> Result<BulkResult> {
    let body = serde_json::to_value(BulkStatusRequest { ids, status })?;
    let request = RequestDescriptor::post(format!("{}/bulk-status", JOURNEYS)).json(body);
    self.write(&journey_changed(None), &request).await
  }

  pub async fn update_milestone(
    &self,
    journey_id: u64,
    milestone_id: u64,
    update: &MilestoneUpdate,
  ) -> Result<MilestoneProgress> {
    let request = RequestDescriptor::put(format!(
      "{}/{}/milestones/{}",
      JOURNEYS, journey_id, milestone_id
    ))
    .json(serde_json::to_value(update)?);
    self.write(&milestone_changed(journey_id), &request).await
  }

  /// Submit a milestone with attachments as multipart form data.
  pub async fn submit_milestone(
    &self,
    journey_id: u64,
    milestone_id: u64,
    submission: &MilestoneSubmission,
  ) -> Result<MilestoneProgress> {
    let request = RequestDescriptor::post(format!(
      "{}/{}/milestones/{}/submit",
      JOURNEYS, journey_id, milestone_id
    ))
    .multipart(submission.to_multipart());
    self.write(&milestone_changed(journey_id), &request).await
  }

  /// Download a journey export (not cached, not decoded).
  pub async fn export(&self, id: u64, format: ExportFormat) -> Result<Blob> {
    let request = RequestDescriptor::get(format!("{}/{}/export", JOURNEYS, id))
      .with_query(QueryParams::new().with("format", format));
    self.executor.blob(&request).await
  }

  async fn read<T: DeserializeOwned>(
    &self,
    key: &JourneyQueryKey,
    ttl: std::time::Duration,
    request: &RequestDescriptor,
  ) -> Result<T> {
    let result = self
      .cache
      .fetch(key, ttl, || self.executor.json(request))
      .await?;
    Ok(result.data)
  }

  async fn write<T: DeserializeOwned>(
    &self,
    plan: &Invalidation,
    request: &RequestDescriptor,
  ) -> Result<T> {
    let value = self
      .cache
      .mutate(plan, || self.executor.json(request))
      .await?;
    Ok(serde_json::from_value(value)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{Attachment, RetryPolicy};
  use crate::auth::StaticToken;
  use crate::cache::CacheKey;
  use crate::error::ApiError;
  use httpmock::MockServer;
  use serde_json::{json, Value};
  use std::time::Duration;

  fn service(server: &MockServer) -> JourneyService {
    let executor = RequestExecutor::new(
      &server.base_url(),
      Arc::new(StaticToken::new("pastor-token")),
      RetryPolicy::new(3, Duration::from_millis(1)),
    )
    .unwrap();
    JourneyService::new(Arc::new(executor), CacheLayer::in_memory(), TtlPolicy::default())
  }

  fn journey_json(id: u64, status: &str) -> Value {
    json!({
      "id": id,
      "member_id": 100 + id,
      "template_id": 1,
      "status": status
    })
  }

  #[tokio::test]
  async fn test_list_twice_hits_network_once() {
    let server = MockServer::start_async().await;
    let list = server
      .mock_async(|when, then| {
        when
          .method("GET")
          .path("/api/member-journeys")
          .query_param("status", "in_progress");
        then
          .status(200)
          .json_body(json!({ "journeys": [journey_json(1, "in_progress")], "total": 1 }));
      })
      .await;

    let journeys = service(&server);
    let filters = JourneyFilters::status(JourneyStatus::InProgress);

    let first = journeys.list(&filters).await.unwrap();
    let second = journeys.list(&filters).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.total, 1);
    list.assert_calls_async(1).await;
  }

  #[tokio::test]
  async fn test_update_between_lists_forces_refetch() {
    let server = MockServer::start_async().await;
    let list = server
      .mock_async(|when, then| {
        when
          .method("GET")
          .path("/api/member-journeys")
          .query_param("status", "in_progress");
        then
          .status(200)
          .json_body(json!({ "journeys": [journey_json(1, "in_progress")], "total": 1 }));
      })
      .await;
    let update = server
      .mock_async(|when, then| {
        when
          .method("PUT")
          .path("/api/member-journeys/1")
          .json_body(json!({ "status": "paused" }));
        then.status(200).json_body(journey_json(1, "paused"));
      })
      .await;

    let journeys = service(&server);
    let filters = JourneyFilters::status(JourneyStatus::InProgress);

    journeys.list(&filters).await.unwrap();
    let updated = journeys
      .update(1, &JourneyUpdate::status(JourneyStatus::Paused))
      .await
      .unwrap();
    journeys.list(&filters).await.unwrap();

    assert_eq!(updated.status, JourneyStatus::Paused);
    update.assert_async().await;
    list.assert_calls_async(2).await;
  }

  #[tokio::test]
  async fn test_failed_update_keeps_cache() {
    let server = MockServer::start_async().await;
    let detail = server
      .mock_async(|when, then| {
        when.method("GET").path("/api/member-journeys/4");
        then.status(200).json_body(journey_json(4, "in_progress"));
      })
      .await;
    let update = server
      .mock_async(|when, then| {
        when.method("PUT").path("/api/member-journeys/4");
        then
          .status(422)
          .json_body(json!({ "message": "Mentor is not a leader" }));
      })
      .await;

    let journeys = service(&server);
    journeys.get_by_id(4).await.unwrap();

    let err = journeys
      .update(
        4,
        &JourneyUpdate {
          mentor_id: Some(9),
          ..JourneyUpdate::default()
        },
      )
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "Mentor is not a leader (HTTP 422 Unprocessable Entity)");

    journeys.get_by_id(4).await.unwrap();
    update.assert_calls_async(3).await;
    detail.assert_calls_async(1).await;
  }

  #[tokio::test]
  async fn test_failed_read_is_not_cached() {
    let server = MockServer::start_async().await;
    let stats = server
      .mock_async(|when, then| {
        when.method("GET").path("/api/member-journeys/stats");
        then.status(503);
      })
      .await;

    let journeys = service(&server);
    let err = journeys.stats(&JourneyFilters::default()).await.unwrap_err();

    assert!(matches!(err, ApiError::Http { .. }));
    assert!(journeys.cache.storage().is_empty());
    stats.assert_calls_async(3).await;
  }

  #[tokio::test]
  async fn test_delete_evicts_detail_and_lists() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method("GET").path("/api/member-journeys/2");
        then.status(200).json_body(journey_json(2, "completed"));
      })
      .await;
    server
      .mock_async(|when, then| {
        when.method("GET").path("/api/member-journeys");
        then.status(200).json_body(json!({ "journeys": [], "total": 0 }));
      })
      .await;
    server
      .mock_async(|when, then| {
        when.method("GET").path("/api/journey-templates");
        then.status(200).json_body(json!({ "templates": [] }));
      })
      .await;
    server
      .mock_async(|when, then| {
        when.method("DELETE").path("/api/member-journeys/2");
        then.status(204);
      })
      .await;

    let journeys = service(&server);
    journeys.get_by_id(2).await.unwrap();
    journeys
      .list(&JourneyFilters {
        page: Some(2),
        ..JourneyFilters::default()
      })
      .await
      .unwrap();
    journeys.templates().await.unwrap();
    assert_eq!(journeys.cache.storage().len(), 3);

    journeys.remove(2).await.unwrap();

    // Only the unrelated template list survives
    let storage = journeys.cache.storage();
    assert_eq!(storage.len(), 1);
    assert!(storage.get(&JourneyQueryKey::Templates.cache_key()).is_some());
    assert!(storage.get(&CacheKey::entity("member_journey", 2)).is_none());
  }

  #[tokio::test]
  async fn test_submit_milestone_invalidates_progress() {
    let server = MockServer::start_async().await;
    let progress = server
      .mock_async(|when, then| {
        when.method("GET").path("/api/member-journeys/5/milestones");
        then.status(200).json_body(json!({
          "milestones": [{ "milestone_id": 1, "title": "Baptism class", "status": "pending" }]
        }));
      })
      .await;
    let submit = server
      .mock_async(|when, then| {
        when
          .method("POST")
          .path("/api/member-journeys/5/milestones/1/submit")
          .header("authorization", "Bearer pastor-token")
          .header_includes("content-type", "multipart/form-data")
          .body_includes("Completed all sessions");
        then.status(200).json_body(json!({
          "milestone_id": 1,
          "title": "Baptism class",
          "status": "completed",
          "attachments": [{ "id": 77, "file_name": "attendance.pdf" }]
        }));
      })
      .await;

    let journeys = service(&server);
    journeys.milestone_progress(5).await.unwrap();

    let submitted = journeys
      .submit_milestone(
        5,
        1,
        &MilestoneSubmission {
          notes: Some("Completed all sessions".to_string()),
          completed_by: Some(12),
          attachments: vec![Attachment::new("attendance.pdf", b"%PDF".to_vec())],
        },
      )
      .await
      .unwrap();
    assert_eq!(submitted.attachments.len(), 1);

    journeys.milestone_progress(5).await.unwrap();
    submit.assert_async().await;
    progress.assert_calls_async(2).await;
  }

  #[tokio::test]
  async fn test_export_bypasses_cache() {
    let server = MockServer::start_async().await;
    let export = server
      .mock_async(|when, then| {
        when
          .method("GET")
          .path("/api/member-journeys/3/export")
          .query_param("format", "pdf");
        then
          .status(200)
          .header("content-type", "application/json")
          .body(r#"{"looks":"like json"}"#);
      })
      .await;

    let journeys = service(&server);
    let first = journeys.export(3, ExportFormat::Pdf).await.unwrap();
    let second = journeys.export(3, ExportFormat::Pdf).await.unwrap();

    assert_eq!(first.bytes, br#"{"looks":"like json"}"#.to_vec());
    assert_eq!(first, second);
    assert!(journeys.cache.storage().is_empty());
    export.assert_calls_async(2).await;
  }

  #[tokio::test]
  async fn test_bulk_status_update() {
    let server = MockServer::start_async().await;
    let bulk = server
      .mock_async(|when, then| {
        when
          .method("POST")
          .path("/api/member-journeys/bulk-status")
          .json_body(json!({ "ids": [1, 2, 3], "status": "completed" }));
        then.status(200).json_body(json!({ "updated": 3 }));
      })
      .await;

    let journeys = service(&server);
    let result = journeys
      .bulk_update_status(&[1, 2, 3], JourneyStatus::Completed)
      .await
      .unwrap();

    assert_eq!(result.updated, 3);
    assert!(result.failed.is_empty());
    bulk.assert_async().await;
  }

  #[tokio::test]
  async fn test_read_recovers_after_outage_and_caches() {
    let server = MockServer::start_async().await;
    let outage = server
      .mock_async(|when, then| {
        when.method("GET").path("/api/member-journeys/6");
        then.status(503);
      })
      .await;

    let executor = RequestExecutor::new(
      &server.base_url(),
      Arc::new(StaticToken::new("pastor-token")),
      RetryPolicy::new(3, Duration::from_millis(300)),
    )
    .unwrap();
    let journeys =
      JourneyService::new(Arc::new(executor), CacheLayer::in_memory(), TtlPolicy::default());

    let recover = async {
      while outage.calls_async().await == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
      }
      outage.delete_async().await;
      server
        .mock_async(|when, then| {
          when.method("GET").path("/api/member-journeys/6");
          then.status(200).json_body(journey_json(6, "in_progress"));
        })
        .await
    };

    let (first, healthy) = tokio::join!(journeys.get_by_id(6), recover);
    let second = journeys.get_by_id(6).await.unwrap();

    assert_eq!(first.unwrap(), second);
    assert_eq!(journeys.cache.storage().len(), 1);
    healthy.assert_calls_async(1).await;
  }
}
