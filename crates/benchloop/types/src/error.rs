//! Program construction errors.

use thiserror::Error;

/// Errors raised while assembling a benchmark program.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgramError {
    /// A program must contain at least one instruction.
    #[error("program '{0}' has no instructions")]
    Empty(String),

    /// The final instruction would let the core run past defined memory.
    #[error("program '{name}' must end in a halt or self-branch, found {last:#010x}")]
    MissingTerminator { name: String, last: u32 },

    /// No built-in benchmark has this name.
    #[error("unknown benchmark '{0}'")]
    UnknownBenchmark(String),
}

/// Result type for program construction.
pub type ProgramResult<T> = Result<T, ProgramError>;
