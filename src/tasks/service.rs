//! Task facade. Same read/write shape as journeys, one cache family.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::api::{Blob, BulkResult, ExportFormat, Page, RequestDescriptor, RequestExecutor};
use crate::cache::{CacheLayer, Invalidation};
use crate::error::Result;
use crate::TtlPolicy;

use super::cache::{task_changed, TaskQueryKey};
use super::types::{
  AssignRequest, BulkCompleteRequest, CommentListResponse, CommentRequest, NewTask, Task,
  TaskComment, TaskFilters, TaskListResponse, TaskStats, TaskUpdate,
};

const TASKS: &str = "/api/tasks";

#[derive(Clone)]
pub struct TaskService {
  executor: Arc<RequestExecutor>,
  cache: CacheLayer,
  ttl: TtlPolicy,
}

impl TaskService {
  pub fn new(executor: Arc<RequestExecutor>, cache: CacheLayer, ttl: TtlPolicy) -> Self {
    Self {
      executor,
      cache,
      ttl,
    }
  }

  pub async fn list(&self, filters: &TaskFilters) -> Result<Page<Task>> {
    let query = filters.to_query();
    let request = RequestDescriptor::get(TASKS).with_query(query.clone());
    let response: TaskListResponse = self
      .read(&TaskQueryKey::List { query }, self.ttl.default, &request)
      .await?;
    Ok(response.into())
  }

  pub async fn get_by_id(&self, id: u64) -> Result<Task> {
    let request = RequestDescriptor::get(format!("{}/{}", TASKS, id));
    self
      .read(&TaskQueryKey::Detail { id }, self.ttl.default, &request)
      .await
  }

  pub async fn stats(&self, filters: &TaskFilters) -> Result<TaskStats> {
    let query = filters.to_query();
    let request = RequestDescriptor::get(format!("{}/stats", TASKS)).with_query(query.clone());
    self
      .read(&TaskQueryKey::Stats { query }, self.ttl.stats, &request)
      .await
  }

  pub async fn comments(&self, task_id: u64) -> Result<Vec<TaskComment>> {
    let request = RequestDescriptor::get(format!("{}/{}/comments", TASKS, task_id));
    let response: CommentListResponse = self
      .read(&TaskQueryKey::Comments { task_id }, self.ttl.default, &request)
      .await?;
    Ok(response.comments)
  }

  pub async fn create(&self, task: &NewTask) -> Result<Task> {
    let request = RequestDescriptor::post(TASKS).json(serde_json::to_value(task)?);
    let created: Task = self.write(&task_changed(None), &request).await?;
    info!(id = created.id, title = %created.title, "Created task");
    Ok(created)
  }

  pub async fn update(&self, id: u64, update: &TaskUpdate) -> Result<Task> {
    let request =
      RequestDescriptor::put(format!("{}/{}", TASKS, id)).json(serde_json::to_value(update)?);
    self.write(&task_changed(Some(id)), &request).await
  }

  pub async fn remove(&self, id: u64) -> Result<()> {
    let request = RequestDescriptor::delete(format!("{}/{}", TASKS, id));
    self
      .cache
      .mutate(&task_changed(Some(id)), || self.executor.json(&request))
      .await?;
    info!(id, "Deleted task");
    Ok(())
  }

  pub async fn complete(&self, id: u64) -> Result<Task> {
    let request = RequestDescriptor::post(format!("{}/{}/complete", TASKS, id));
    self.write(&task_changed(Some(id)), &request).await
  }

  pub async fn assign(&self, id: u64, assignee: u64) -> Result<Task> {
    let body = serde_json::to_value(AssignRequest {
      assigned_to: assignee,
    })?;
    let request = RequestDescriptor::put(format!("{}/{}/assign", TASKS, id)).json(body);
    self.write(&task_changed(Some(id)), &request).await
  }

  pub async fn bulk_complete(&self, ids: &[u64]) -> Result<BulkResult> {
    let body = serde_json::to_value(BulkCompleteRequest { ids })?;
    let request = RequestDescriptor::post(format!("{}/bulk-complete", TASKS)).json(body);
    self.write(&task_changed(None), &request).await
  }

  pub async fn add_comment(&self, task_id: u64, body: &str) -> Result<TaskComment> {
    let payload = serde_json::to_value(CommentRequest { body })?;
    let request = RequestDescriptor::post(format!("{}/{}/comments", TASKS, task_id)).json(payload);
    self.write(&task_changed(Some(task_id)), &request).await
  }

  /// Export the filtered task list. Never cached.
  pub async fn export(&self, filters: &TaskFilters, format: ExportFormat) -> Result<Blob> {
    let mut query = filters.to_query();
    query.push("format", format);
    let request = RequestDescriptor::get(format!("{}/export", TASKS)).with_query(query);
    self.executor.blob(&request).await
  }

  async fn read<T: DeserializeOwned>(
    &self,
    key: &TaskQueryKey,
    ttl: Duration,
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
