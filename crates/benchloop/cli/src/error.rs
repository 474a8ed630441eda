//! CLI error types

use benchloop_core::{LockError, PatchError, PipelineError, RunFailure, ScoreError};
use benchloop_toolchain::ToolchainError;
use benchloop_types::ProgramError;
use thiserror::Error;

/// CLI error types
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Benchmark program error
    #[error(transparent)]
    Program(#[from] ProgramError),

    /// Injection error
    #[error(transparent)]
    Patch(#[from] PatchError),

    /// Pipeline stage error outside a full run
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A full run stopped early
    #[error(transparent)]
    Run(#[from] Box<RunFailure>),

    /// Toolchain error
    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    /// Another run is in progress
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Scoring error
    #[error(transparent)]
    Score(#[from] ScoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<config::ConfigError> for CliError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
