use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total: u64,
}

impl<T> Page<T> {
  /// Build a page, falling back to the item count when the backend omits `total`.
  pub fn new(items: Vec<T>, total: Option<u64>) -> Self {
    let total = total.unwrap_or(items.len() as u64);
    Self { items, total }
  }
}

/// Opaque binary download (exports, attachments).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
  pub bytes: Vec<u8>,
  pub content_type: Option<String>,
}

impl Blob {
  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  pub fn save(&self, path: &Path) -> std::io::Result<()> {
    std::fs::write(path, &self.bytes)
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
  #[default]
  Json,
  Pdf,
}

impl ExportFormat {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Json => "json",
      Self::Pdf => "pdf",
    }
  }

  pub fn extension(&self) -> &'static str {
    self.as_str()
  }
}

impl fmt::Display for ExportFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  Asc,
  Desc,
}

impl fmt::Display for SortOrder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Asc => f.write_str("asc"),
      Self::Desc => f.write_str("desc"),
    }
  }
}

/// Result of a bulk status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkResult {
  #[serde(default)]
  pub updated: u64,
  #[serde(default)]
  pub failed: Vec<u64>,
}
