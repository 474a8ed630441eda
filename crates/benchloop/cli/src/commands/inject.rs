//! Inject the benchmark program without running the rest of the loop

use std::path::PathBuf;

use benchloop_core::{encode_program, patch, patcher, RunLock};
use clap::Args;

use super::load_benchmark;
use crate::config::BenchConfig;
use crate::error::CliResult;
use crate::output::{print_info, print_success};

#[derive(Args)]
pub struct InjectArgs {
    /// Built-in benchmark name
    #[arg(short, long, default_value = "matmul")]
    benchmark: String,

    /// Hardware project root
    #[arg(long, env = "BENCHLOOP_HARDWARE_DIR")]
    hardware_dir: Option<PathBuf>,

    /// Only verify that the markers are present
    #[arg(long)]
    check: bool,
}

pub fn execute(args: InjectArgs, mut config: BenchConfig) -> CliResult<()> {
    if let Some(dir) = args.hardware_dir {
        config.hardware_dir = dir;
    }
    let pipeline = config.pipeline();
    let target = pipeline.patch_target();

    if args.check {
        let region = patcher::check(&target)?;
        print_success(&format!(
            "Markers found in {} (region bytes {}..{})",
            target.path.display(),
            region.region.start,
            region.region.end
        ));
        return Ok(());
    }

    let program = load_benchmark(&args.benchmark)?;
    let _lock = RunLock::acquire(config.lock_path())?;
    let lines = encode_program(&program, pipeline.patch.encoding);
    let outcome = patch(&target, &lines)?;

    if outcome.changed {
        print_success(&format!(
            "Injected {} ({} entries) into {}",
            program.name(),
            outcome.entries,
            target.path.display()
        ));
    } else {
        print_info(&format!("{} already up to date", target.path.display()));
    }
    Ok(())
}
