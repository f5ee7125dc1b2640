//! CLI-specific error types

use thiserror::Error;

use crate::config::ConfigError;
use crate::schema::{SchemaError, ValidationError};

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error("{0}")]
    Invalid(#[from] ValidationError),

    #[error("failed to read '{path}': {reason}")]
    Io { path: String, reason: String },

    #[error("invalid JSON in '{path}': {reason}")]
    Json { path: String, reason: String },

    #[error("invalid parameter '{0}', expected key=value")]
    Parameter(String),
}

impl CliError {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "RESOURCEKIT_CLI_CONFIG_ERROR",
            Self::Schema(_) => "RESOURCEKIT_CLI_SCHEMA_ERROR",
            Self::Invalid(_) => "RESOURCEKIT_CLI_INVALID_DOCUMENT",
            Self::Io { .. } | Self::Json { .. } => "RESOURCEKIT_CLI_IO_ERROR",
            Self::Parameter(_) => "RESOURCEKIT_CLI_BAD_PARAMETER",
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
