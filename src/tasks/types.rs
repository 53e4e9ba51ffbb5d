use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::api::{Page, QueryParams, SortOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
  Pending,
  InProgress,
  Completed,
  Cancelled,
}

impl fmt::Display for TaskStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Pending => "pending",
      Self::InProgress => "in_progress",
      Self::Completed => "completed",
      Self::Cancelled => "cancelled",
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
  Low,
  Medium,
  High,
  Urgent,
}

impl fmt::Display for TaskPriority {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Low => "low",
      Self::Medium => "medium",
      Self::High => "high",
      Self::Urgent => "urgent",
    })
  }
}

/// Follow-up work item (visit, call, prayer request, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
  pub id: u64,
  pub title: String,
  pub description: Option<String>,
  pub status: TaskStatus,
  pub priority: Option<TaskPriority>,
  pub category: Option<String>,
  pub due_date: Option<NaiveDate>,
  pub assigned_to: Option<u64>,
  pub assignee_name: Option<String>,
  pub related_member_id: Option<u64>,
  pub related_journey_id: Option<u64>,
  pub created_at: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
  pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskComment {
  pub id: u64,
  pub task_id: u64,
  pub author_name: Option<String>,
  pub body: String,
  pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStats {
  pub total: u64,
  #[serde(default)]
  pub overdue: u64,
  #[serde(default)]
  pub due_this_week: u64,
  #[serde(default)]
  pub by_status: BTreeMap<String, u64>,
  #[serde(default)]
  pub by_priority: BTreeMap<String, u64>,
}

// ============================================================================
// Request payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTask {
  pub title: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority: Option<TaskPriority>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub due_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub assigned_to: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub related_member_id: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub related_journey_id: Option<u64>,
}

impl NewTask {
  pub fn titled(title: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      description: None,
      priority: None,
      category: None,
      due_date: None,
      assigned_to: None,
      related_member_id: None,
      related_journey_id: None,
    }
  }
}

/// Partial update; only set fields are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<TaskStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority: Option<TaskPriority>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignRequest {
  pub assigned_to: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct BulkCompleteRequest<'a> {
  pub ids: &'a [u64],
}

#[derive(Debug, Serialize)]
pub(crate) struct CommentRequest<'a> {
  pub body: &'a str,
}

// ============================================================================
// List filters
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilters {
  pub status: Option<TaskStatus>,
  pub priority: Option<TaskPriority>,
  pub assigned_to: Option<u64>,
  pub related_member_id: Option<u64>,
  /// Sent as repeated `category` parameters
  pub categories: Vec<String>,
  pub due_before: Option<NaiveDate>,
  pub due_after: Option<NaiveDate>,
  pub search: Option<String>,
  pub sort_by: Option<String>,
  pub sort_order: Option<SortOrder>,
  pub page: Option<u32>,
  pub limit: Option<u32>,
}

impl TaskFilters {
  pub fn to_query(&self) -> QueryParams {
    let mut query = QueryParams::new();
    query.push_opt("status", self.status);
    query.push_opt("priority", self.priority);
    query.push_opt("assigned_to", self.assigned_to);
    query.push_opt("related_member_id", self.related_member_id);
    query.push_all("category", &self.categories);
    query.push_opt("due_before", self.due_before);
    query.push_opt("due_after", self.due_after);
    query.push_opt("search", self.search.as_deref());
    query.push_opt("sort_by", self.sort_by.as_deref());
    query.push_opt("sort_order", self.sort_order);
    query.push_opt("page", self.page);
    query.push_opt("limit", self.limit);
    query
  }
}

// ============================================================================
// Wire envelopes
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct TaskListResponse {
  #[serde(alias = "items")]
  pub tasks: Vec<Task>,
  pub total: Option<u64>,
}

impl From<TaskListResponse> for Page<Task> {
  fn from(response: TaskListResponse) -> Self {
    Page::new(response.tasks, response.total)
  }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentListResponse {
  #[serde(alias = "items")]
  pub comments: Vec<TaskComment>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_filters_with_dates_and_categories() {
    let filters = TaskFilters {
      priority: Some(TaskPriority::Urgent),
      categories: vec!["hospital_visit".to_string(), "".to_string()],
      due_before: NaiveDate::from_ymd_opt(2024, 6, 1),
      ..TaskFilters::default()
    };

    assert_eq!(
      filters.to_query().normalized(),
      "category=hospital_visit&due_before=2024-06-01&priority=urgent"
    );
  }

  #[test]
  fn test_default_filters_are_empty() {
    assert!(TaskFilters::default().to_query().is_empty());
  }

  #[test]
  fn test_items_alias_and_missing_total() {
    let response: TaskListResponse = serde_json::from_value(json!({
      "items": [{
        "id": 1,
        "title": "Call the Nguyen family",
        "status": "pending",
        "due_date": "2024-05-20"
      }]
    }))
    .unwrap();

    let page: Page<Task> = response.into();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].due_date, NaiveDate::from_ymd_opt(2024, 5, 20));
  }

  #[test]
  fn test_new_task_skips_unset_fields() {
    let task = NewTask {
      priority: Some(TaskPriority::High),
      ..NewTask::titled("Deliver meals")
    };

    assert_eq!(
      serde_json::to_value(&task).unwrap(),
      json!({ "title": "Deliver meals", "priority": "high" })
    );
  }
}
