//! CLI error types.

use crate::config::ConfigError;
use thiserror::Error;

/// CLI errors.
///
/// Query failures are not here: they come back from the runtime as
/// messages and are printed like answers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration could not be read or parsed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The `ask` subcommand was given no prompt.
    #[error("no question given")]
    EmptyPrompt,

    /// Ctrl+C was pressed twice while a query was running.
    #[error("interrupted")]
    Interrupted,

    /// An I/O error occurred on the terminal.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
