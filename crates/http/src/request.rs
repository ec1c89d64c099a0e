//! Outgoing request assembly for the API client

use reqwest::header::HeaderValue;
use reqwest::Url;
use serde_json::Value;
use uuid::{Timestamp, Uuid};

use shelf_kernel::{Method, RequestSpec};

use crate::error::FetchError;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// A request bound to a concrete URL and tagged with a request id
pub struct OutgoingRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<Value>,
    pub request_id: Uuid,
}

impl OutgoingRequest {
    /// Resolve `request` against the base URL
    pub fn new(base_url: &Url, request: &RequestSpec) -> Result<Self, FetchError> {
        Ok(Self {
            method: request.method,
            url: url_for(base_url, &request.segments)?,
            body: request.body.clone(),
            request_id: Uuid::new_v7(Timestamp::now(uuid::NoContext)),
        })
    }

    /// Convert into a reqwest builder on the shared client
    pub fn into_builder(self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        let method = match self.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = client.request(method, self.url);

        if let Ok(value) = HeaderValue::from_str(&self.request_id.to_string()) {
            builder = builder.header(REQUEST_ID_HEADER, value);
        }

        if let Some(body) = self.body {
            builder = builder.json(&body);
        }

        builder
    }
}

/// Append path segments to the base URL, percent-encoding each one
pub fn url_for(base_url: &Url, segments: &[String]) -> Result<Url, FetchError> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|_| FetchError::custom(format!("base URL '{base_url}' cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
