use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::api::{Attachment, MultipartBody, Page, QueryParams, SortOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyStatus {
  NotStarted,
  InProgress,
  Paused,
  Completed,
  Cancelled,
}

impl JourneyStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::NotStarted => "not_started",
      Self::InProgress => "in_progress",
      Self::Paused => "paused",
      Self::Completed => "completed",
      Self::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for JourneyStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
  Pending,
  InProgress,
  Completed,
  Skipped,
}

/// A member's progress through a discipleship/membership journey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberJourney {
  pub id: u64,
  pub member_id: u64,
  pub template_id: u64,
  pub status: JourneyStatus,
  pub member_name: Option<String>,
  pub template_name: Option<String>,
  pub mentor_id: Option<u64>,
  pub current_milestone_id: Option<u64>,
  pub progress_percent: Option<f64>,
  pub notes: Option<String>,
  pub started_at: Option<DateTime<Utc>>,
  pub completed_at: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
}

/// Journey blueprint (e.g. "New Member Pathway")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyTemplate {
  pub id: u64,
  pub name: String,
  pub description: Option<String>,
  #[serde(default)]
  pub is_active: bool,
  #[serde(default)]
  pub milestones: Vec<MilestoneDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneDefinition {
  pub id: u64,
  pub title: String,
  pub description: Option<String>,
  #[serde(default)]
  pub order: u32,
  #[serde(default)]
  pub requires_attachment: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneProgress {
  pub milestone_id: u64,
  pub title: String,
  pub status: MilestoneStatus,
  pub notes: Option<String>,
  pub completed_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub attachments: Vec<AttachmentInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentInfo {
  pub id: u64,
  pub file_name: String,
  pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyStats {
  pub total: u64,
  #[serde(default)]
  pub by_status: BTreeMap<String, u64>,
  #[serde(default)]
  pub completed_this_month: u64,
  pub average_completion_days: Option<f64>,
}

// ============================================================================
// Request payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewJourney {
  pub member_id: u64,
  pub template_id: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub mentor_id: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

/// Partial update; only set fields are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JourneyUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<JourneyStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub mentor_id: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub current_milestone_id: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

impl JourneyUpdate {
  pub fn status(status: JourneyStatus) -> Self {
    Self {
      status: Some(status),
      ..Self::default()
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MilestoneUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<MilestoneStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

/// Milestone completion with supporting files, sent as multipart form data
#[derive(Debug, Clone, Default)]
pub struct MilestoneSubmission {
  pub notes: Option<String>,
  pub completed_by: Option<u64>,
  pub attachments: Vec<Attachment>,
}

impl MilestoneSubmission {
  pub fn to_multipart(&self) -> MultipartBody {
    let mut body = MultipartBody::new();
    if let Some(notes) = self.notes.as_deref().filter(|n| !n.is_empty()) {
      body = body.text("notes", notes);
    }
    if let Some(by) = self.completed_by {
      body = body.text("completed_by", by.to_string());
    }
    for attachment in &self.attachments {
      body = body.file("attachments", attachment.clone());
    }
    body
  }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct BulkStatusRequest<'a> {
  pub ids: &'a [u64],
  pub status: JourneyStatus,
}

// ============================================================================
// List filters
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JourneyFilters {
  pub status: Option<JourneyStatus>,
  pub member_id: Option<u64>,
  pub mentor_id: Option<u64>,
  /// Sent as repeated `template_id` parameters
  pub template_ids: Vec<u64>,
  pub search: Option<String>,
  pub sort_by: Option<String>,
  pub sort_order: Option<SortOrder>,
  pub page: Option<u32>,
  pub limit: Option<u32>,
}

impl JourneyFilters {
  pub fn status(status: JourneyStatus) -> Self {
    Self {
      status: Some(status),
      ..Self::default()
    }
  }

  pub fn to_query(&self) -> QueryParams {
    let mut query = QueryParams::new();
    query.push_opt("status", self.status);
    query.push_opt("member_id", self.member_id);
    query.push_opt("mentor_id", self.mentor_id);
    query.push_all("template_id", &self.template_ids);
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
pub(crate) struct JourneyListResponse {
  #[serde(alias = "items")]
  pub journeys: Vec<MemberJourney>,
  pub total: Option<u64>,
}

impl From<JourneyListResponse> for Page<MemberJourney> {
  fn from(response: JourneyListResponse) -> Self {
    Page::new(response.journeys, response.total)
  }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TemplateListResponse {
  #[serde(alias = "items")]
  pub templates: Vec<JourneyTemplate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MilestoneListResponse {
  #[serde(alias = "items")]
  pub milestones: Vec<MilestoneProgress>,
}
