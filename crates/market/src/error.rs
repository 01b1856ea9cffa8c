use std::time::Duration;
use thiserror::Error;

/// Errors returned by the quote/indicator client.
///
/// Every failure of a single upstream call ends up here; callers turn it
/// into a structured tool result instead of aborting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// No data-API key was configured for this query.
    #[error("Alpha Vantage API Key not set.")]
    MissingKey,

    /// The request could not be sent or the connection failed.
    #[error("{0}")]
    Transport(String),

    /// The request did not complete within the allotted time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The API answered with a non-success status.
    #[error("{status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not valid JSON.
    #[error("invalid response body: {0}")]
    InvalidBody(String),

    /// A parameter could not be converted into a query value.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ApiError>;
