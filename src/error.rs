use thiserror::Error;

use shelf_http::{ErrorStatus, FetchError, Rejected};

use crate::validation::ValidationErrors;

/// Why a catalog action did not go through.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("invalid input: {0}")]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Rejected(#[from] Rejected),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The server could not be reached.
    Network,
    /// The server answered with an error status.
    HttpStatus,
    /// A 2xx answer that reported failure or could not be used.
    Application,
    /// The input never left the client.
    Validation,
}

impl ActionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ActionError::Invalid(_) => FailureKind::Validation,
            ActionError::Rejected(_) => FailureKind::Application,
            ActionError::Fetch(err) => match err.status {
                ErrorStatus::Fetch => FailureKind::Network,
                ErrorStatus::Http(_) => FailureKind::HttpStatus,
                ErrorStatus::Parsing { .. } | ErrorStatus::Custom => FailureKind::Application,
            },
        }
    }

    pub fn validation(&self) -> Option<&ValidationErrors> {
        match self {
            ActionError::Invalid(errors) => Some(errors),
            _ => None,
        }
    }
}
