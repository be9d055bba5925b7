//! Error types for the CLI

use async_runtime::RuntimeError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// The event loop stopped on a configured limit or was misused
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// File I/O error
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for `EventLoopConfig`
    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),

    /// No scenario with the given name
    #[error("Unknown scenario '{0}' (run with --list to see them)")]
    UnknownScenario(String),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
