//! Direct toolchain calls

use std::path::PathBuf;

use benchloop_toolchain::{from_config, AnalysisReport, BackendKind};
use benchloop_types::SimulationKind;
use clap::Subcommand;

use crate::config::BenchConfig;
use crate::error::CliResult;
use crate::output::{print_single, print_success, print_warning, OutputFormat};

/// Toolchain subcommands
#[derive(Subcommand)]
pub enum ToolCommands {
    /// Synthesize HDL sources into a bitstream
    Synthesize {
        /// HDL sources; defaults to the configured files
        hdl_files: Vec<PathBuf>,

        /// Top module
        #[arg(long)]
        top: Option<String>,

        /// FPGA part number
        #[arg(long)]
        part: Option<String>,
    },

    /// Program a device with a bitstream
    Flash {
        /// Bitstream path
        bitstream: PathBuf,

        /// Target device
        #[arg(long)]
        device: Option<String>,
    },

    /// Report timing, power or utilization
    Analyze {
        /// Metric name
        metric: String,
    },

    /// Simulate a testbench
    Verify {
        /// Testbench source
        testbench: PathBuf,

        /// behavioral, post-synthesis or post-implementation
        #[arg(long, default_value = "behavioral")]
        kind: SimulationKind,
    },
}

/// Execute a toolchain command
pub async fn execute(
    command: ToolCommands,
    backend: Option<BackendKind>,
    config: &BenchConfig,
    format: OutputFormat,
) -> CliResult<()> {
    let mut toolchain_config = config.toolchain.clone();
    if let Some(backend) = backend {
        toolchain_config.backend = backend;
    }
    let gateway = from_config(&toolchain_config);
    let pipeline = config.pipeline();

    match command {
        ToolCommands::Synthesize {
            hdl_files,
            top,
            part,
        } => {
            let sources = if hdl_files.is_empty() {
                pipeline.hdl_paths()
            } else {
                hdl_files
            };
            let top = top.unwrap_or_else(|| pipeline.synthesis.top_module.clone());
            let part = part.unwrap_or_else(|| pipeline.synthesis.part_number.clone());
            let artifact = gateway.synthesize(&sources, &top, &part).await?;
            match format {
                OutputFormat::Table => print_success(&artifact.summary),
                _ => print_single(&artifact, format)?,
            }
        }

        ToolCommands::Flash { bitstream, device } => {
            let device = device.or_else(|| pipeline.synthesis.device_id.clone());
            let confirmation = gateway.flash(&bitstream, device.as_deref()).await?;
            match format {
                OutputFormat::Table => print_success(&confirmation.message),
                _ => print_single(&confirmation, format)?,
            }
        }

        ToolCommands::Analyze { metric } => {
            let report = gateway.analyze(&metric).await?;
            match (&report, format) {
                (AnalysisReport::UnknownMetric(_), OutputFormat::Table) => {
                    print_warning(&report.text())
                }
                (_, OutputFormat::Table) => println!("{}", report.text()),
                _ => print_single(&report, format)?,
            }
        }

        ToolCommands::Verify { testbench, kind } => {
            let report = gateway.verify(&testbench, kind).await?;
            match format {
                OutputFormat::Table if report.passed => print_success(&report.to_string()),
                OutputFormat::Table => print_warning(&report.to_string()),
                _ => print_single(&report, format)?,
            }
        }
    }
    Ok(())
}
