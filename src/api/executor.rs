//! HTTP request executor.
//! Handles bearer auth, JSON/multipart bodies, and retry with backoff.

use std::sync::Arc;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::auth::TokenSource;
use crate::error::{ApiError, Result};

use super::params::QueryParams;
use super::request::{RequestBody, RequestDescriptor};
use super::retry::{RetryPolicy, RetryState};
use super::types::Blob;

const JSON: &str = "application/json";

/// `{ message }` error body convention.
#[derive(Debug, Deserialize)]
struct ErrorBody {
  message: String,
}

/// How a successful response body will be consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseKind {
  Json,
  Blob,
}

/// Performs one logical HTTP call against the backend.
pub struct RequestExecutor {
  client: Client,
  base_url: String,
  tokens: Arc<dyn TokenSource>,
  retry: RetryPolicy,
}

impl RequestExecutor {
  pub fn new(base_url: &str, tokens: Arc<dyn TokenSource>, retry: RetryPolicy) -> Result<Self> {
    Url::parse(base_url)
      .map_err(|e| ApiError::InvalidRequest(format!("invalid base URL {}: {}", base_url, e)))?;

    let client = Client::builder()
      .user_agent(concat!("flock/", env!("CARGO_PKG_VERSION")))
      .build()?;

    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      tokens,
      retry,
    })
  }

  /// Execute a request and decode the body as JSON.
  ///
  /// Empty bodies (e.g. `204 No Content`) decode to `null`.
  pub async fn json(&self, request: &RequestDescriptor) -> Result<Value> {
    let response = self.dispatch(request, ResponseKind::Json).await?;
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
      return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
  }

  /// Execute a request and return the raw body without decoding it.
  pub async fn blob(&self, request: &RequestDescriptor) -> Result<Blob> {
    let response = self.dispatch(request, ResponseKind::Blob).await?;
    let content_type = response
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(String::from);
    let bytes = response.bytes().await?.to_vec();

    Ok(Blob {
      bytes,
      content_type,
    })
  }

  /// Send with retries until a 2xx arrives or attempts run out.
  async fn dispatch(&self, request: &RequestDescriptor, kind: ResponseKind) -> Result<Response> {
    let url = self.url(&request.endpoint, &request.query)?;
    let token = self.tokens.token()?;
    let mut state = RetryState::default();

    while !state.exhausted(&self.retry) {
      if state.attempt > 0 {
        let delay = self.retry.delay_after(state.attempt);
        if let Some(error) = &state.last_error {
          if error.is_rate_limited() {
            warn!(
              endpoint = %request.endpoint,
              attempt = state.attempt,
              ?delay,
              "Rate limited, backing off"
            );
          } else {
            warn!(
              endpoint = %request.endpoint,
              attempt = state.attempt,
              ?delay,
              %error,
              "Request failed, retrying"
            );
          }
        }
        tokio::time::sleep(delay).await;
      }
      state.attempt += 1;

      debug!(
        method = %request.method,
        endpoint = %request.endpoint,
        attempt = state.attempt,
        "Sending request"
      );
      let error = match self.send_once(request, url.clone(), token.as_deref()).await {
        Ok(response) if response.status().is_success() => return Ok(response),
        Ok(response) => failure(response, kind).await,
        Err(e) => e,
      };
      state.last_error = Some(error);
    }

    Err(state.into_error())
  }

  async fn send_once(
    &self,
    request: &RequestDescriptor,
    url: Url,
    token: Option<&str>,
  ) -> Result<Response> {
    let mut builder = self.client.request(request.method.clone(), url);
    if let Some(token) = token {
      builder = builder.bearer_auth(token);
    }

    builder = match &request.body {
      RequestBody::Empty => builder.header(ACCEPT, JSON).header(CONTENT_TYPE, JSON),
      RequestBody::Json(body) => builder.header(ACCEPT, JSON).json(body),
      // reqwest sets the multipart boundary header itself
      RequestBody::Multipart(form) => builder.multipart(form.to_form()?),
    };

    Ok(builder.send().await?)
  }

  fn url(&self, endpoint: &str, query: &QueryParams) -> Result<Url> {
    let raw = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
    let mut url = Url::parse(&raw)
      .map_err(|e| ApiError::InvalidRequest(format!("invalid endpoint {}: {}", endpoint, e)))?;

    if !query.is_empty() {
      let mut pairs = url.query_pairs_mut();
      for (name, value) in query.iter() {
        pairs.append_pair(name, value);
      }
    }
    Ok(url)
  }
}

/// Convert a non-2xx response into the matching error.
async fn failure(response: Response, kind: ResponseKind) -> ApiError {
  let status = response.status();
  let reason = status.canonical_reason().unwrap_or("Unknown status").to_string();

  match kind {
    ResponseKind::Json => {
      let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .map(|body| body.message)
        .filter(|m| !m.is_empty())
        .unwrap_or(reason);
      ApiError::Http { status, message }
    }
    ResponseKind::Blob => ApiError::Export {
      status,
      message: reason,
    },
  }
}
