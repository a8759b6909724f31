use axum::http::StatusCode;
use thiserror::Error;

use crate::error::ErrorBody;

const NETWORK_MESSAGE: &str =
    "Network error. Please check your connection and make sure the server is running.";

/// A failed call as the client reports it to the user.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestFailure {
    /// Transport never produced a response; shown as a generic connectivity message.
    #[error("{}", NETWORK_MESSAGE)]
    Network,
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
}

impl RequestFailure {
    /// Builds the failure from an error response, falling back to the status line
    /// when the body is not a structured error.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<ErrorBody>(body)
            .map(|b| b.message)
            .unwrap_or_else(|_| format!("Request failed with status {status}"));
        RequestFailure::Rejected { status, message }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RequestFailure::Network => None,
            RequestFailure::Rejected { status, .. } => Some(*status),
        }
    }
}
