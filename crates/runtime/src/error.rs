use crate::model::ModelError;
use thiserror::Error;

/// Errors that end a query before the model produces an answer.
///
/// The display strings are what the caller ultimately shows the user.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Please provide an API Key in the sidebar.")]
    MissingProviderKey,

    #[error("Please provide an Alpha Vantage API Key in the sidebar.")]
    MissingDataKey,

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Error interacting with {provider}: {source}")]
    Provider {
        provider: String,
        #[source]
        source: ModelError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
