//! In-memory response caching for API reads.
//!
//! This module provides a resource-agnostic caching mechanism that:
//! - Caches decoded JSON documents under normalized request keys
//! - Expires entries lazily after a per-call TTL
//! - Evicts single keys and whole resource families after mutations
//! - Never stores failed or undecodable responses

mod invalidation;
mod key;
mod layer;
mod storage;
mod traits;

pub use invalidation::Invalidation;
pub use key::CacheKey;
pub use layer::CacheLayer;
pub use storage::{CacheEntry, CacheStorage, NoopStorage, ResponseCache, DEFAULT_TTL, STATS_TTL};
pub use traits::{CacheResult, CacheSource, QueryKey};
