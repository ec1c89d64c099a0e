//! Failure envelope for the lending API client

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use shelf_kernel::EndpointError;

/// Success is `Ok(data)`, failure is `Err(FetchError)`; ordinary HTTP error
/// statuses land in `Err` and never panic.
pub type ApiResult<T> = Result<T, FetchError>;

/// Where a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStatus {
    /// Server answered with a non-2xx status.
    Http(u16),
    /// No answer: connection refused, DNS failure, reset.
    Fetch,
    /// Server answered but the body was not valid JSON.
    Parsing { original: u16 },
    /// The request could not be built.
    Custom,
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorStatus::Http(code) => write!(f, "{code}"),
            ErrorStatus::Fetch => f.write_str("FETCH_ERROR"),
            ErrorStatus::Parsing { .. } => f.write_str("PARSING_ERROR"),
            ErrorStatus::Custom => f.write_str("CUSTOM_ERROR"),
        }
    }
}

impl Serialize for ErrorStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ErrorStatus::Http(code) => serializer.serialize_u16(*code),
            other => serializer.collect_str(other),
        }
    }
}

/// Failure envelope: `{ "status": .., "message": .. }`.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{status}: {message}")]
pub struct FetchError {
    pub status: ErrorStatus,
    pub message: String,
    /// Parsed error body, when the server sent one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl FetchError {
    /// Create an HTTP status error
    pub fn http(code: u16, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            status: ErrorStatus::Http(code),
            message: message.into(),
            data,
        }
    }

    /// Create a transport error (no response received)
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: ErrorStatus::Fetch,
            message: message.into(),
            data: None,
        }
    }

    /// Create a body decoding error
    pub fn parsing(original: u16, message: impl Into<String>) -> Self {
        Self {
            status: ErrorStatus::Parsing { original },
            message: message.into(),
            data: None,
        }
    }

    /// Create a request construction error
    pub fn custom(message: impl Into<String>) -> Self {
        Self {
            status: ErrorStatus::Custom,
            message: message.into(),
            data: None,
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self.status {
            ErrorStatus::Http(code) | ErrorStatus::Parsing { original: code } => Some(code),
            ErrorStatus::Fetch | ErrorStatus::Custom => None,
        }
    }

    /// True when the request reached the server and it answered.
    pub fn server_responded(&self) -> bool {
        self.http_status().is_some()
    }
}

impl From<EndpointError> for FetchError {
    fn from(err: EndpointError) -> Self {
        Self::custom(err.to_string())
    }
}
