//! Bearer token sources.
//!
//! The executor reads the token at call time and never caches it, so a
//! login or logout takes effect on the very next request.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Environment variable that overrides the persisted token.
pub const TOKEN_ENV: &str = "FLOCK_API_TOKEN";

/// Supplies the bearer token for outgoing requests.
pub trait TokenSource: Send + Sync {
  /// Current token, or None when logged out.
  fn token(&self) -> Result<Option<String>>;
}

/// A fixed token (environment override, tests).
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

impl StaticToken {
  pub fn new(token: impl Into<String>) -> Self {
    Self(Some(token.into()))
  }

  pub fn none() -> Self {
    Self(None)
  }

  /// Token from the `FLOCK_API_TOKEN` environment variable, if set.
  pub fn from_env() -> Option<Self> {
    std::env::var(TOKEN_ENV)
      .ok()
      .filter(|t| !t.trim().is_empty())
      .map(|t| Self::new(t.trim()))
  }
}

impl TokenSource for StaticToken {
  fn token(&self) -> Result<Option<String>> {
    Ok(self.0.clone())
  }
}

/// Token persisted in a file under the user's data directory.
#[derive(Debug, Clone)]
pub struct TokenStore {
  path: PathBuf,
}

impl TokenStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// `$XDG_DATA_HOME/flock/token` or the platform equivalent.
  pub fn default_path() -> Option<PathBuf> {
    dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .map(|dir| dir.join("flock").join("token"))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn save(&self, token: &str) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(&self.path, token.trim())?;
    Ok(())
  }

  pub fn clear(&self) -> Result<()> {
    match fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }
}

impl TokenSource for TokenStore {
  fn token(&self) -> Result<Option<String>> {
    match fs::read_to_string(&self.path) {
      Ok(contents) => {
        let token = contents.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
      }
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }
}
