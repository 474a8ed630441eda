//! Standalone scorer

use std::path::PathBuf;

use benchloop_core::score;
use clap::Args;

use crate::config::BenchConfig;
use crate::error::{CliError, CliResult};
use crate::output::{print_single, print_warning, OutputFormat};

#[derive(Args)]
pub struct ScoreArgs {
    /// Measured execution time in seconds
    #[arg(short, long)]
    elapsed: f64,

    /// Utilization report text
    #[arg(short, long, conflicts_with = "report_file")]
    report: Option<String>,

    /// File holding the utilization report
    #[arg(long)]
    report_file: Option<PathBuf>,

    /// Resource key; defaults to the configured key
    #[arg(short, long)]
    key: Option<String>,
}

pub fn execute(args: ScoreArgs, config: &BenchConfig, format: OutputFormat) -> CliResult<()> {
    let report = match (args.report, args.report_file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => {
            return Err(CliError::InvalidInput(
                "one of --report or --report-file is required".into(),
            ))
        }
    };
    let key = args.key.unwrap_or_else(|| config.scoring.resource_key.clone());
    let result = score(args.elapsed, &report, &key)?;

    match format {
        OutputFormat::Table => {
            println!("{:.2}", result.value);
            if result.defaulted {
                print_warning(&format!("{} not in report, assumed {}%", key, result.utilization_percent));
            }
            Ok(())
        }
        _ => print_single(&result, format),
    }
}
