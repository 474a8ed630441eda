//! Toolchain error types.
//!
//! Separates "the tool could not be started" from "the tool ran and
//! reported failure", and both from a missing bitstream.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during a toolchain call.
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// Flash was asked for a bitstream that neither exists nor was produced
    /// by this gateway.
    #[error("Bitstream {0} not found")]
    ArtifactNotFound(PathBuf),

    /// An HDL source handed to synthesis does not exist.
    #[error("HDL source {0} not found")]
    SourceNotFound(PathBuf),

    /// The external tool could not be started at all.
    #[error("Failed to launch {tool}: {source}")]
    ToolInvocation {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The external tool ran but exited unsuccessfully.
    #[error("{tool} exited with {exit_code:?}: {tail}")]
    CommandFailed {
        tool: String,
        exit_code: Option<i32>,
        tail: String,
    },

    /// The external tool did not finish in time and was killed.
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    /// Gateway state lock was poisoned by a panicking caller.
    #[error("Gateway state lock poisoned")]
    LockPoisoned,

    /// IO error while writing scripts or reading reports.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for toolchain operations.
pub type ToolchainResult<T> = Result<T, ToolchainError>;
