use std::time::Duration;
use thiserror::Error;

/// Failures talking to a model provider.
///
/// These end the current query; the runtime wraps them with the provider
/// name before they reach the user.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The request could not be sent or the connection failed.
    #[error("network: {0}")]
    Network(String),

    /// No response arrived within the request timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The provider answered with a non-success status.
    #[error("provider api: {0}")]
    Api(String),

    /// The body did not match the provider's wire format.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    /// Classify a transport failure from a request bounded by `timeout`.
    pub(crate) fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Network(err.without_url().to_string())
        }
    }
}
