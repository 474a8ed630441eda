//! Error types for the benchmark pipeline.

use std::path::PathBuf;
use std::time::Duration;

use benchloop_toolchain::ToolchainError;
use benchloop_types::{BuildResult, ProgramError, RunBuilder, Stage};
use thiserror::Error;

/// Which marker of a [`PatchTarget`](benchloop_types::PatchTarget) was missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    Start,
    End,
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::End => write!(f, "end"),
        }
    }
}

/// Source patching errors. The target file is never modified when one
/// of these is returned.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("{marker} marker {text:?} not found in {}", path.display())]
    MarkerNotFound {
        marker: Marker,
        text: String,
        path: PathBuf,
    },

    /// The rendered entries would end the region early on the next parse.
    #[error("Program entries contain the end marker {marker:?} (entry {})", describe_entry(.entry))]
    EndMarkerInEntries { marker: String, entry: Option<usize> },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn describe_entry(entry: &Option<usize>) -> String {
    entry.map_or_else(|| "across entries".to_string(), |i| i.to_string())
}

/// Build invocation errors. A non-zero exit is not one of these.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to launch build tool {program}: {source}")]
    ToolInvocation {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Build timed out after {0:?}")]
    Timeout(Duration),
}

/// Completion monitoring errors.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Completion signal not seen within {timeout:?} (waited {elapsed:?})")]
    CompletionTimeout { timeout: Duration, elapsed: Duration },

    #[error("Completion channel error: {0}")]
    Channel(#[from] std::io::Error),
}

/// Scoring errors.
#[derive(Debug, Error, PartialEq)]
pub enum ScoreError {
    #[error("Elapsed time must be positive and finite, got {0}")]
    NonPositiveElapsed(f64),
}

/// Run lock errors.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Another run holds {}", .0.display())]
    Held(PathBuf),

    #[error("Lock file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reason a pipeline stage failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid program: {0}")]
    Program(#[from] ProgramError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Build(#[from] BuildError),

    /// The build ran and exited unsuccessfully.
    #[error("Build failed with exit code {:?}", .0.exit_code)]
    BuildFailure(BuildResult),

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error("Run exceeded overall timeout of {0:?}")]
    RunTimeout(Duration),

    /// A stage reported success without recording its output.
    #[error("No output recorded for stage {0}")]
    MissingOutput(Stage),
}

/// A run that stopped before producing a score.
#[derive(Debug, Error)]
#[error("run failed at stage {stage}: {reason}")]
pub struct RunFailure {
    pub stage: Stage,
    #[source]
    pub reason: PipelineError,
    /// Stage outputs recorded before the failure.
    pub partial: Box<RunBuilder>,
}

pub type PatchResult<T> = Result<T, PatchError>;
pub type BuildInvokeResult<T> = Result<T, BuildError>;
pub type MonitorResult<T> = Result<T, MonitorError>;
pub type ScoreResult<T> = Result<T, ScoreError>;
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_not_found_display() {
        let e = PatchError::MarkerNotFound {
            marker: Marker::Start,
            text: "val program = VecInit(Seq(".into(),
            path: PathBuf::from("Memory.scala"),
        };
        let msg = e.to_string();
        assert!(msg.starts_with("start marker"));
        assert!(msg.contains("Memory.scala"));
    }

    #[test]
    fn build_failure_names_exit_code() {
        let e = PipelineError::BuildFailure(BuildResult {
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "error".into(),
            duration: Duration::from_secs(2),
        });
        assert_eq!(e.to_string(), "Build failed with exit code Some(1)");
    }

    #[test]
    fn toolchain_errors_pass_through() {
        let e: PipelineError =
            ToolchainError::ArtifactNotFound(PathBuf::from("build/Top.bit")).into();
        assert_eq!(e.to_string(), "Bitstream build/Top.bit not found");
    }
}
