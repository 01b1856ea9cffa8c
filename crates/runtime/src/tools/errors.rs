use market::ApiError;
use thiserror::Error;

/// Errors that can occur during tool execution.
///
/// The display strings are what the model sees in the `error` field of a
/// failed tool result.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ToolError {
    /// The model asked for a tool the catalog does not have.
    #[error("Unknown function")]
    NotFound(String),

    /// Neither `symbol` nor a complete `from_symbol`/`to_symbol` pair.
    #[error("Missing symbol info")]
    MissingSymbol,

    /// The upstream call (or its parameter conversion) failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}
