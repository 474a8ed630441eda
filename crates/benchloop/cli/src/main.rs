//! benchloop - FPGA design benchmark loop
//!
//! Injects a benchmark program into a CPU design, rebuilds and synthesizes
//! it, programs the device, times the program and scores the design.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod output;

use crate::commands::{inject, program, run, score, tool};
use crate::config::BenchConfig;
use crate::error::CliResult;

/// benchloop CLI application
#[derive(Parser)]
#[command(name = "benchloop")]
#[command(about = "Benchmark and score FPGA CPU designs", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "BENCHLOOP_CONFIG")]
    config: Option<String>,

    /// Output format (table, json, yaml)
    #[arg(short, long, default_value = "table")]
    output: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, env = "BENCHLOOP_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Run the full benchmark loop
    Run(run::RunArgs),

    /// Print the encoded benchmark program
    Program(program::ProgramArgs),

    /// Inject the benchmark program into the design source
    Inject(inject::InjectArgs),

    /// Score a measured time against a utilization report
    Score(score::ScoreArgs),

    /// Call the toolchain directly
    Tool {
        /// Toolchain backend (mock, vivado)
        #[arg(long, env = "BENCHLOOP_BACKEND")]
        backend: Option<benchloop_toolchain::BackendKind>,

        #[command(subcommand)]
        command: tool::ToolCommands,
    },

    /// Show effective configuration
    Config,
}

fn init_tracing(verbose: bool, json: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    // Logs go to stderr; stdout carries command output.
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .without_time()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn dispatch(cli: Cli, config: BenchConfig) -> CliResult<()> {
    match cli.command {
        Commands::Run(args) => run::execute(args, config, cli.output).await,
        Commands::Program(args) => program::execute(args, &config, cli.output),
        Commands::Inject(args) => inject::execute(args, config),
        Commands::Score(args) => score::execute(args, &config, cli.output),
        Commands::Tool { backend, command } => {
            tool::execute(command, backend, &config, cli.output).await
        }
        Commands::Config => output::print_single(&config, output::OutputFormat::Yaml),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match BenchConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            output::print_error(&format!("Configuration error: {}", e));
            std::process::exit(2);
        }
    };
    init_tracing(cli.verbose, cli.log_json || config.logging.json, &config.logging.level);
    tracing::debug!(config = ?cli.config, backend = %config.toolchain.backend, "Configuration loaded");

    if let Err(e) = dispatch(cli, config).await {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}
