//! Error taxonomy for the query lifecycle

use std::time::Duration;
use thiserror::Error;

/// Failure of a single search request.
///
/// Every variant except [`SearchError::Cancelled`] is a transport failure:
/// it ends the request in the failed state. `Cancelled` means the request
/// was superseded and is never shown to the user.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("request superseded by a newer query")]
    Cancelled,

    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search endpoint returned HTTP {status}")]
    Status { status: u16 },

    #[error("malformed search response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("search request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid search endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

impl SearchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SearchError::Cancelled)
    }

    /// Short label used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::Cancelled => "cancelled",
            SearchError::Http(_) => "http",
            SearchError::Status { .. } => "status",
            SearchError::Decode(_) => "decode",
            SearchError::Timeout(_) => "timeout",
            SearchError::InvalidEndpoint { .. } => "endpoint",
        }
    }
}
