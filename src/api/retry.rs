//! Retry policy for the request executor.

use std::time::Duration;

use crate::error::ApiError;

/// Attempt cap and linear backoff.
///
/// The delay before attempt `n + 1` is `backoff * n`. Rate-limited (429)
/// responses consume an attempt like any other failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub backoff: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      backoff: Duration::from_millis(1000),
    }
  }
}

impl RetryPolicy {
  pub fn new(max_attempts: u32, backoff: Duration) -> Self {
    Self {
      max_attempts: max_attempts.max(1),
      backoff,
    }
  }

  /// Delay to wait after the given failed attempt (1-based). Saturates
  /// instead of overflowing.
  pub fn delay_after(&self, attempt: u32) -> Duration {
    self.backoff.checked_mul(attempt).unwrap_or(Duration::MAX)
  }

  /// Every delay a request that always fails would sleep through.
  pub fn schedule(&self) -> Vec<Duration> {
    (1..self.max_attempts).map(|a| self.delay_after(a)).collect()
  }
}

/// State of one logical request across attempts.
#[derive(Debug, Default)]
pub struct RetryState {
  pub attempt: u32,
  pub last_error: Option<ApiError>,
}

impl RetryState {
  pub fn exhausted(&self, policy: &RetryPolicy) -> bool {
    self.attempt >= policy.max_attempts
  }

  pub fn into_error(self) -> ApiError {
    self
      .last_error
      .unwrap_or_else(|| ApiError::InvalidRequest("request was never attempted".to_string()))
  }
}
