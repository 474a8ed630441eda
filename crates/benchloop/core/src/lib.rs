//! # benchloop-core
//!
//! The FPGA benchmark loop.
//!
//! A [`BenchmarkPipeline`] takes a [`Program`](benchloop_types::Program)
//! through six stages:
//!
//! 1. **Inject**: encode the program and splice it into the design source
//! 2. **Build**: regenerate HDL from the design
//! 3. **Synthesize**: produce a bitstream through the toolchain gateway
//! 4. **Flash**: program the device
//! 5. **Measure**: time the program until it emits its completion byte
//! 6. **Analyze/Score**: read utilization and compute the design score
//!
//! ```text
//! score = (1 / elapsed_s) × (100 / utilization_%) × 1000
//! ```

#![deny(unsafe_code)]

pub mod benchmarks;
pub mod build;
pub mod config;
pub mod encoder;
pub mod error;
pub mod lock;
pub mod monitor;
pub mod patcher;
pub mod pipeline;
pub mod scorer;

// ── Re-exports ──────────────────────────────────────────────────────

pub use build::{BuildCommand, BuildInvoker, CommandBuildInvoker};
pub use config::{
    BuildConfig, BuildFailurePolicy, PatchConfig, PipelineConfig, ScoringConfig, SynthesisConfig,
};
pub use encoder::{encode_program, EncodeOptions, EncodingFormat};
pub use error::{
    BuildError, LockError, Marker, MonitorError, PatchError, PipelineError, PipelineResult,
    RunFailure, ScoreError,
};
pub use lock::RunLock;
pub use monitor::{
    CompletionChannel, CompletionMonitor, DeviceChannel, MonitorConfig, ScriptedChannel,
    SerialConfig,
};
pub use patcher::{parse_region, patch, MarkedRegion, PatchOutcome};
pub use pipeline::{BenchmarkPipeline, ChannelFactory};
pub use scorer::score;
