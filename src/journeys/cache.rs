//! Cache keys and invalidation plans for journey reads.

use crate::api::QueryParams;
use crate::cache::{CacheKey, Invalidation, QueryKey};

/// Family shared by journey lists, details and stats.
pub const JOURNEY_FAMILY: &str = "member_journey";
/// Family for per-journey milestone progress.
pub const MILESTONE_FAMILY: &str = "milestone_progress";
/// Family for journey templates.
pub const TEMPLATE_FAMILY: &str = "journey_template";

/// Query key types for journey API calls.
#[derive(Clone, Debug)]
pub enum JourneyQueryKey {
  /// Filtered journey list
  List { query: QueryParams },
  /// A single journey
  Detail { id: u64 },
  /// Aggregate statistics, optionally filtered
  Stats { query: QueryParams },
  /// Milestone progress for one journey
  Milestones { journey_id: u64 },
  /// All journey templates
  Templates,
  /// A single template
  Template { id: u64 },
}

impl QueryKey for JourneyQueryKey {
  fn cache_key(&self) -> CacheKey {
    match self {
      Self::List { query } => CacheKey::new("member_journeys", query),
      Self::Detail { id } => CacheKey::entity(JOURNEY_FAMILY, id),
      Self::Stats { query } => CacheKey::new("member_journey_stats", query),
      Self::Milestones { journey_id } => CacheKey::entity(MILESTONE_FAMILY, journey_id),
      Self::Templates => CacheKey::new("journey_templates", &QueryParams::new()),
      Self::Template { id } => CacheKey::entity(TEMPLATE_FAMILY, id),
    }
  }

  fn description(&self) -> String {
    match self {
      Self::List { query } if query.is_empty() => "all journeys".to_string(),
      Self::List { query } => format!("journeys: {}", query.normalized()),
      Self::Detail { id } => format!("journey {}", id),
      Self::Stats { .. } => "journey stats".to_string(),
      Self::Milestones { journey_id } => format!("milestones of journey {}", journey_id),
      Self::Templates => "journey templates".to_string(),
      Self::Template { id } => format!("journey template {}", id),
    }
  }
}

/// Evictions after a journey create/update/delete.
pub fn journey_changed(id: Option<u64>) -> Invalidation {
  let plan = Invalidation::new();
  let plan = match id {
    Some(id) => plan.key(JourneyQueryKey::Detail { id }.cache_key()),
    None => plan,
  };
  plan.family(JOURNEY_FAMILY)
}

/// Evictions after a milestone update or submission.
pub fn milestone_changed(journey_id: u64) -> Invalidation {
  journey_changed(Some(journey_id))
    .key(JourneyQueryKey::Milestones { journey_id }.cache_key())
    .family(MILESTONE_FAMILY)
}
