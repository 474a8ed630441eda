//! # benchloop-types
//!
//! Data model for the FPGA benchmark loop.
//!
//! ## Lifecycle
//!
//! ```text
//! Program → BuildResult → SynthesisArtifact → FlashConfirmation
//!         → elapsed Duration → UtilizationReport → Score
//! ```
//!
//! Every stage record is immutable once produced. A [`BenchmarkRun`]
//! aggregates them and becomes read-only once the score is attached.

#![deny(unsafe_code)]

pub mod artifact;
pub mod error;
pub mod program;
pub mod report;
pub mod run;

// ── Re-exports ──────────────────────────────────────────────────────

pub use artifact::{BuildResult, FlashConfirmation, SynthesisArtifact};
pub use error::{ProgramError, ProgramResult};
pub use program::{Instruction, PatchTarget, Program};
pub use report::{
    lookup_percentage, MetricKind, ParseKindError, PercentageLookup, SimulationKind,
    UtilizationReport,
};
pub use run::{BenchmarkRun, RunBuilder, RunId, Score, Stage, StageOutcome, StageStatus};
