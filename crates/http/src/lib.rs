//! HTTP client facade bound to the lending API base URL.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::Value;

use shelf_kernel::settings::ApiSettings;
use shelf_kernel::RequestSpec;

pub mod envelope;
pub mod error;
pub mod request;

pub use envelope::{Rejected, ServerEnvelope};
pub use error::{ApiResult, ErrorStatus, FetchError};

use request::OutgoingRequest;

/// Issues resolved requests and returns the decoded JSON body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &RequestSpec) -> ApiResult<Value>;
}

/// Shared client for the lending API; the base URL is fixed at construction.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings) -> anyhow::Result<Self> {
        let base_url = Url::parse(&settings.base_url)
            .with_context(|| format!("invalid API base URL '{}'", settings.base_url))?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("shelf/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl Transport for ApiClient {
    async fn execute(&self, request: &RequestSpec) -> ApiResult<Value> {
        let outgoing = OutgoingRequest::new(&self.base_url, request)?;
        let request_id = outgoing.request_id;

        tracing::debug!(
            request_id = %request_id,
            method = %outgoing.method,
            url = %outgoing.url,
            "sending request"
        );

        let response = outgoing
            .into_builder(&self.http)
            .send()
            .await
            .map_err(|err| {
                tracing::warn!(request_id = %request_id, error = %err, "request failed");
                FetchError::network(err.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| FetchError::network(err.to_string()))?;

        tracing::debug!(
            request_id = %request_id,
            status_code = %status.as_u16(),
            "response received"
        );

        decode_response(status, &text)
    }
}

/// Turn a raw response into the success or failure envelope.
fn decode_response(status: StatusCode, text: &str) -> ApiResult<Value> {
    let parsed = if text.trim().is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_str::<Value>(text)
    };

    if status.is_success() {
        return parsed.map_err(|err| FetchError::parsing(status.as_u16(), err.to_string()));
    }

    let reason = status.canonical_reason().unwrap_or("request failed");
    let error = match parsed {
        Ok(body) => {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(reason)
                .to_string();
            FetchError::http(status.as_u16(), message, Some(body))
        }
        Err(_) if !text.trim().is_empty() => FetchError::http(status.as_u16(), text.trim(), None),
        Err(_) => FetchError::http(status.as_u16(), reason, None),
    };

    tracing::warn!(status_code = %status.as_u16(), message = %error.message, "API error status");
    Err(error)
}
