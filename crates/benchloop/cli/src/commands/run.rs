//! Full benchmark loop

use std::path::PathBuf;
use std::time::Duration;

use benchloop_core::{
    BenchmarkPipeline, BuildFailurePolicy, ChannelFactory, CommandBuildInvoker,
    CompletionChannel, DeviceChannel, RunLock, ScriptedChannel,
};
use benchloop_toolchain::{from_config, BackendKind};
use clap::Args;

use super::load_benchmark;
use crate::config::BenchConfig;
use crate::error::{CliError, CliResult};
use crate::output::{print_info, print_run, print_stages, OutputFormat};

#[derive(Args)]
pub struct RunArgs {
    /// Built-in benchmark name
    #[arg(short, long, default_value = "matmul")]
    benchmark: String,

    /// Toolchain backend (mock, vivado)
    #[arg(long, env = "BENCHLOOP_BACKEND")]
    backend: Option<BackendKind>,

    /// Hardware project root
    #[arg(long, env = "BENCHLOOP_HARDWARE_DIR")]
    hardware_dir: Option<PathBuf>,

    /// Device carrying the completion byte
    #[arg(long)]
    device: Option<PathBuf>,

    /// Serial baud rate of the device
    #[arg(long)]
    baud_rate: Option<u32>,

    /// Simulated execution time in seconds (mock backend only)
    #[arg(long, value_parser = parse_positive_seconds)]
    mock_completion: Option<f64>,

    /// Overall run timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Keep going after a failed build
    #[arg(long)]
    continue_on_build_failure: bool,
}

fn parse_positive_seconds(value: &str) -> Result<f64, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", value))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("must be a positive number of seconds, got {}", value));
    }
    Ok(secs)
}

impl RunArgs {
    fn apply(&self, config: &mut BenchConfig) {
        if let Some(backend) = self.backend {
            config.toolchain.backend = backend;
        }
        if let Some(dir) = &self.hardware_dir {
            config.hardware_dir = dir.clone();
        }
        if let Some(device) = &self.device {
            config.completion.device = Some(device.clone());
        }
        if let Some(baud) = self.baud_rate {
            config.completion.serial.baud_rate = baud;
        }
        if let Some(secs) = self.mock_completion {
            config.completion.mock_delay_ms = ((secs * 1000.0).round() as u64).max(1);
        }
        if let Some(secs) = self.timeout_secs {
            config.run_timeout_secs = secs;
        }
        if self.continue_on_build_failure {
            config.build.on_failure = BuildFailurePolicy::Continue;
        }
    }
}

fn channel_factory(config: &BenchConfig) -> CliResult<ChannelFactory> {
    if let Some(device) = config.completion.device.clone() {
        let serial = config.completion.serial.clone();
        return Ok(Box::new(move || {
            Ok(Box::new(DeviceChannel::open(&device, &serial)?) as Box<dyn CompletionChannel>)
        }));
    }
    match config.toolchain.backend {
        BackendKind::Mock => {
            let delay = Duration::from_millis(config.completion.mock_delay_ms.max(1));
            let sentinel = config.monitor.sentinel;
            Ok(Box::new(move || {
                Ok(Box::new(ScriptedChannel::after(delay, sentinel)) as Box<dyn CompletionChannel>)
            }))
        }
        BackendKind::Vivado => Err(CliError::Config(
            "completion.device must be set when using the vivado backend".into(),
        )),
    }
}

pub async fn execute(args: RunArgs, mut config: BenchConfig, format: OutputFormat) -> CliResult<()> {
    args.apply(&mut config);
    let program = load_benchmark(&args.benchmark)?;
    let channels = channel_factory(&config)?;
    let _lock = RunLock::acquire(config.lock_path())?;

    let pipeline = BenchmarkPipeline::new(
        config.pipeline(),
        Box::new(CommandBuildInvoker::new()),
        from_config(&config.toolchain),
        channels,
    );

    if matches!(format, OutputFormat::Table) {
        print_info(&format!(
            "Running {} on {} backend",
            program.name(),
            pipeline.toolchain().name()
        ));
    }

    match pipeline.run(&program).await {
        Ok(run) => print_run(&run, format),
        Err(failure) => {
            if matches!(format, OutputFormat::Table) {
                print_stages(&failure.partial.stages);
            }
            Err(CliError::Run(Box::new(failure)))
        }
    }
}
