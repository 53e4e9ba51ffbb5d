//! Per-call request descriptors.

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::Value;

use crate::error::{ApiError, Result};

use super::params::QueryParams;

/// A file attached to a multipart submission.
#[derive(Debug, Clone)]
pub struct Attachment {
  pub file_name: String,
  pub content_type: Option<String>,
  pub bytes: Vec<u8>,
}

impl Attachment {
  pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
    Self {
      file_name: file_name.into(),
      content_type: None,
      bytes,
    }
  }

  pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
    self.content_type = Some(content_type.into());
    self
  }
}

/// Multipart form held as owned parts.
///
/// `reqwest::multipart::Form` is consumed on send, so the form is rebuilt for
/// every attempt.
#[derive(Debug, Clone, Default)]
pub struct MultipartBody {
  fields: Vec<(String, String)>,
  files: Vec<(String, Attachment)>,
}

impl MultipartBody {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.fields.push((name.into(), value.into()));
    self
  }

  pub fn file(mut self, name: impl Into<String>, attachment: Attachment) -> Self {
    self.files.push((name.into(), attachment));
    self
  }

  pub fn to_form(&self) -> Result<Form> {
    let mut form = Form::new();
    for (name, value) in &self.fields {
      form = form.text(name.clone(), value.clone());
    }
    for (name, attachment) in &self.files {
      let mut part = Part::bytes(attachment.bytes.clone()).file_name(attachment.file_name.clone());
      if let Some(content_type) = &attachment.content_type {
        part = part.mime_str(content_type).map_err(|e| {
          ApiError::InvalidRequest(format!("bad content type {}: {}", content_type, e))
        })?;
      }
      form = form.part(name.clone(), part);
    }
    Ok(form)
  }
}

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
  #[default]
  Empty,
  Json(Value),
  Multipart(MultipartBody),
}

/// One logical request: endpoint, method, query and body.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
  pub method: Method,
  pub endpoint: String,
  pub query: QueryParams,
  pub body: RequestBody,
}

impl RequestDescriptor {
  pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
    Self {
      method,
      endpoint: endpoint.into(),
      query: QueryParams::new(),
      body: RequestBody::Empty,
    }
  }

  pub fn get(endpoint: impl Into<String>) -> Self {
    Self::new(Method::GET, endpoint)
  }

  pub fn post(endpoint: impl Into<String>) -> Self {
    Self::new(Method::POST, endpoint)
  }

  pub fn put(endpoint: impl Into<String>) -> Self {
    Self::new(Method::PUT, endpoint)
  }

  pub fn delete(endpoint: impl Into<String>) -> Self {
    Self::new(Method::DELETE, endpoint)
  }

  pub fn with_query(mut self, query: QueryParams) -> Self {
    self.query = query;
    self
  }

  pub fn json(mut self, body: Value) -> Self {
    self.body = RequestBody::Json(body);
    self
  }

  pub fn multipart(mut self, body: MultipartBody) -> Self {
    self.body = RequestBody::Multipart(body);
    self
  }
}
