use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;

use shelf_http::{ApiResult, FetchError};

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Uninitialized,
    Pending,
    Fulfilled,
    Rejected,
}

/// Point-in-time view of a cache entry, as published to subscribers.
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
    pub status: QueryStatus,
    /// Last fulfilled payload; kept while a refetch is pending or after it fails.
    pub data: Option<Arc<Value>>,
    pub error: Option<FetchError>,
    /// Set when a mutation invalidated the data; cleared by the next success.
    pub stale: bool,
    pub fulfilled_at: Option<OffsetDateTime>,
}

impl QuerySnapshot {
    pub fn uninitialized() -> Self {
        Self {
            status: QueryStatus::Uninitialized,
            data: None,
            error: None,
            stale: false,
            fulfilled_at: None,
        }
    }

    /// First fetch in flight, nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Pending && self.data.is_none()
    }

    pub fn is_fetching(&self) -> bool {
        self.status == QueryStatus::Pending
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.status, QueryStatus::Fulfilled | QueryStatus::Rejected)
    }

    /// Outcome of the most recent settled request.
    pub fn outcome<T: DeserializeOwned>(&self) -> ApiResult<T> {
        match self.status {
            QueryStatus::Fulfilled => match &self.data {
                Some(value) => decode(value),
                None => Err(FetchError::custom("fulfilled entry has no data")),
            },
            QueryStatus::Rejected => Err(self
                .error
                .clone()
                .unwrap_or_else(|| FetchError::custom("query rejected"))),
            QueryStatus::Uninitialized | QueryStatus::Pending => {
                Err(FetchError::custom("query has not settled"))
            }
        }
    }
}

/// Typed view of a snapshot for one endpoint's output.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    pub data: Option<T>,
    pub error: Option<FetchError>,
    pub stale: bool,
    pub is_loading: bool,
    pub is_fetching: bool,
}

impl<T: DeserializeOwned> QueryState<T> {
    pub fn from_snapshot(snapshot: &QuerySnapshot) -> Self {
        let (data, decode_error) = match snapshot.data.as_deref().map(decode::<T>) {
            Some(Ok(data)) => (Some(data), None),
            Some(Err(err)) => (None, Some(err)),
            None => (None, None),
        };

        Self {
            status: snapshot.status,
            data,
            error: snapshot.error.clone().or(decode_error),
            stale: snapshot.stale,
            is_loading: snapshot.is_loading(),
            is_fetching: snapshot.is_fetching(),
        }
    }
}

pub(crate) fn decode<T: DeserializeOwned>(value: &Value) -> ApiResult<T> {
    T::deserialize(value)
        .map_err(|err| FetchError::custom(format!("unexpected response shape: {err}")))
}
