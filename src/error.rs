//! Error types for the data-access layer.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
  /// Transport failed after exhausting retries
  #[error("Network error: {0}")]
  Network(#[from] reqwest::Error),

  /// Backend answered with a non-2xx status after exhausting retries
  #[error("{message} (HTTP {status})")]
  Http { status: StatusCode, message: String },

  /// Body was not valid JSON where JSON was expected
  #[error("Failed to decode response: {0}")]
  Decode(#[from] serde_json::Error),

  /// Blob download failed; the failure body is never decoded
  #[error("Export failed: {message} (HTTP {status})")]
  Export { status: StatusCode, message: String },

  #[error("Invalid request: {0}")]
  InvalidRequest(String),

  #[error("Failed to read API token: {0}")]
  Token(#[from] std::io::Error),
}

impl ApiError {
  /// HTTP status carried by the error, if the backend answered at all.
  pub fn status(&self) -> Option<StatusCode> {
    match self {
      Self::Http { status, .. } | Self::Export { status, .. } => Some(*status),
      Self::Network(e) => e.status(),
      _ => None,
    }
  }

  pub fn is_rate_limited(&self) -> bool {
    self.status() == Some(StatusCode::TOO_MANY_REQUESTS)
  }
}

pub type Result<T> = std::result::Result<T, ApiError>;
