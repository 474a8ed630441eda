//! Command implementations

pub mod inject;
pub mod program;
pub mod run;
pub mod score;
pub mod tool;

use benchloop_core::benchmarks;
use benchloop_types::Program;

use crate::error::CliResult;

/// Resolve `--benchmark`
pub(crate) fn load_benchmark(name: &str) -> CliResult<Program> {
    Ok(benchmarks::by_name(name)?)
}
