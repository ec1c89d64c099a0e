//! Body wrapper the lending API puts around every payload.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `{ "success": bool, "message": string?, "data": T? }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// A 2xx response whose envelope reports failure or lacks the expected data.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("request rejected by server: {}", .message.as_deref().unwrap_or("no message"))]
pub struct Rejected {
    pub message: Option<String>,
}

impl<T> ServerEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    /// A missing `success` field counts as failure.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Accept the envelope when `success` is set; `data` may be absent.
    pub fn into_result(self) -> Result<Option<T>, Rejected> {
        if self.success {
            Ok(self.data)
        } else {
            Err(Rejected {
                message: self.message,
            })
        }
    }

    /// Accept the envelope only when `success` is set and `data` is present.
    pub fn into_data(self) -> Result<T, Rejected> {
        let message = self.message.clone();
        self.into_result()?.ok_or(Rejected {
            message: message.or_else(|| Some("response carried no data".to_string())),
        })
    }
}
