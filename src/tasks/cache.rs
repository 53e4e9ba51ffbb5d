//! Cache keys and invalidation plans for task reads.

use crate::api::QueryParams;
use crate::cache::{CacheKey, Invalidation, QueryKey};

/// Every task key contains this label.
pub const TASK_FAMILY: &str = "task";

#[derive(Clone, Debug)]
pub enum TaskQueryKey {
  List { query: QueryParams },
  Detail { id: u64 },
  Stats { query: QueryParams },
  Comments { task_id: u64 },
}

impl QueryKey for TaskQueryKey {
  fn cache_key(&self) -> CacheKey {
    match self {
      Self::List { query } => CacheKey::new("tasks", query),
      Self::Detail { id } => CacheKey::entity(TASK_FAMILY, id),
      Self::Stats { query } => CacheKey::new("task_stats", query),
      Self::Comments { task_id } => CacheKey::entity("task_comments", task_id),
    }
  }

  fn description(&self) -> String {
    match self {
      Self::List { query } if query.is_empty() => "all tasks".to_string(),
      Self::List { query } => format!("tasks: {}", query.normalized()),
      Self::Detail { id } => format!("task {}", id),
      Self::Stats { .. } => "task stats".to_string(),
      Self::Comments { task_id } => format!("comments on task {}", task_id),
    }
  }
}

/// Evictions after any task mutation.
pub fn task_changed(id: Option<u64>) -> Invalidation {
  let plan = Invalidation::new();
  let plan = match id {
    Some(id) => plan.key(TaskQueryKey::Detail { id }.cache_key()),
    None => plan,
  };
  plan.family(TASK_FAMILY)
}
