//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Neither a configuration file nor an input directory was given
    #[error("No input: pass --config or --input-dir")]
    MissingInput,

    /// A window bound could not be parsed
    #[error("Invalid datetime '{value}': {message}")]
    InvalidDatetime { value: String, message: String },

    /// Building the window took too long
    #[error("Data window not finished after {seconds}s")]
    Timeout { seconds: u64 },

    /// Ctrl+C / SIGTERM before the window was built
    #[error("Interrupted by shutdown signal")]
    Interrupted,

    /// Library error
    #[error(transparent)]
    Window(#[from] contracts::ContractError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_datetime(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDatetime {
            value: value.into(),
            message: message.into(),
        }
    }
}
