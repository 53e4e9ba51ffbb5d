//! Client data-access layer for the member-management backend.
//!
//! Reads go through a shared in-memory TTL cache; mutations evict the keys
//! they affect once the backend confirms them.

pub mod api;
pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod journeys;
pub mod tasks;

pub use client::{Flock, TtlPolicy};
pub use error::{ApiError, Result};
