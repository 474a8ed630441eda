//! The benchmark loop: inject, build, synthesize, flash, measure, score.
//!
//! Stages run strictly in sequence and each one's outcome is logged and
//! recorded before the next starts. The first failure ends the run and is
//! reported with the stage it happened in; no score is produced.

use std::io;

use benchloop_toolchain::ToolchainGateway;
use benchloop_types::{
    BenchmarkRun, BuildResult, MetricKind, Program, RunBuilder, Score, Stage, StageStatus,
    UtilizationReport,
};
use tracing::{error, info, instrument, warn};

use crate::build::BuildInvoker;
use crate::config::{BuildFailurePolicy, PipelineConfig};
use crate::encoder::encode_program;
use crate::error::{MonitorError, PipelineError, PipelineResult, RunFailure};
use crate::monitor::{CompletionChannel, CompletionMonitor};
use crate::patcher::{self, PatchOutcome};
use crate::scorer;

/// Opens the completion channel right after the device is programmed.
pub type ChannelFactory =
    Box<dyn Fn() -> io::Result<Box<dyn CompletionChannel>> + Send + Sync>;

type StageResult<T> = Result<T, (Stage, PipelineError)>;

fn at<E: Into<PipelineError>>(stage: Stage) -> impl FnOnce(E) -> (Stage, PipelineError) {
    move |e| (stage, e.into())
}

/// Owns one set of collaborators and runs benchmarks through them.
pub struct BenchmarkPipeline {
    config: PipelineConfig,
    builder: Box<dyn BuildInvoker>,
    toolchain: Box<dyn ToolchainGateway>,
    channels: ChannelFactory,
    monitor: CompletionMonitor,
}

impl BenchmarkPipeline {
    pub fn new(
        config: PipelineConfig,
        builder: Box<dyn BuildInvoker>,
        toolchain: Box<dyn ToolchainGateway>,
        channels: ChannelFactory,
    ) -> Self {
        let monitor = CompletionMonitor::new(config.monitor.poll_interval());
        Self {
            config,
            builder,
            toolchain,
            channels,
            monitor,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn toolchain(&self) -> &dyn ToolchainGateway {
        self.toolchain.as_ref()
    }

    /// Run only the injection stage.
    pub fn inject_only(&self, program: &Program) -> PipelineResult<PatchOutcome> {
        self.inject(program)
    }

    /// Execute every stage for `program` under the overall run timeout.
    #[instrument(skip_all, fields(program = %program.name()))]
    pub async fn run(&self, program: &Program) -> Result<BenchmarkRun, RunFailure> {
        let mut run = RunBuilder::new(program.clone());
        info!(run = %run.id, "Starting benchmark run");

        let limit = self.config.run_timeout();
        let result = match tokio::time::timeout(limit, self.execute(&mut run)).await {
            Ok(result) => result,
            Err(_) => Err((next_stage(&run), PipelineError::RunTimeout(limit))),
        };

        let score = match result {
            Ok(score) => score,
            Err((stage, reason)) => return Err(fail(run, stage, reason)),
        };
        match run.clone().finish(score) {
            Ok(finished) => {
                info!(run = %finished.id(), score = finished.score().value, "Benchmark run complete");
                Ok(finished)
            }
            Err(missing) => {
                let reason = PipelineError::MissingOutput(missing);
                Err(fail(run, missing, reason))
            }
        }
    }

    async fn execute(&self, run: &mut RunBuilder) -> StageResult<Score> {
        // Inject
        let patched = self.inject(&run.program).map_err(at(Stage::Inject))?;
        let detail = if patched.changed {
            format!("wrote {} entries", patched.entries)
        } else {
            "program already present".to_string()
        };
        self.complete(run, Stage::Inject, StageStatus::Succeeded, detail);

        // Build
        let build = self.build().await.map_err(at(Stage::Build))?;
        run.build = Some(build.clone());
        if build.success() {
            self.complete(run, Stage::Build, StageStatus::Succeeded, build.to_string());
        } else {
            let tail = build.tail(self.config.build.tail_lines).join("\n");
            match self.config.build.on_failure {
                BuildFailurePolicy::Abort => {
                    error!(exit_code = ?build.exit_code, "Build failed:\n{}", tail);
                    return Err((Stage::Build, PipelineError::BuildFailure(build)));
                }
                BuildFailurePolicy::Continue => {
                    warn!(exit_code = ?build.exit_code, "Build failed, continuing:\n{}", tail);
                    self.complete(run, Stage::Build, StageStatus::Warned, build.to_string());
                }
            }
        }

        // Synthesize
        let synthesis = &self.config.synthesis;
        let artifact = self
            .toolchain
            .synthesize(
                &self.config.hdl_paths(),
                &synthesis.top_module,
                &synthesis.part_number,
            )
            .await
            .map_err(at(Stage::Synthesize))?;
        let detail = artifact.summary.clone();
        run.artifact = Some(artifact.clone());
        self.complete(run, Stage::Synthesize, StageStatus::Succeeded, detail);

        // Flash
        let flashed = self
            .toolchain
            .flash(&artifact.bitstream, synthesis.device_id.as_deref())
            .await
            .map_err(at(Stage::Flash))?;
        let detail = flashed.message.clone();
        run.flash = Some(flashed);
        self.complete(run, Stage::Flash, StageStatus::Succeeded, detail);

        // Measure
        let elapsed = self.measure().await.map_err(at(Stage::Measure))?;
        run.elapsed = Some(elapsed);
        self.complete(
            run,
            Stage::Measure,
            StageStatus::Succeeded,
            format!("{:.4}s", elapsed.as_secs_f64()),
        );

        // Analyze
        let report = self
            .toolchain
            .analyze(&MetricKind::Utilization.to_string())
            .await
            .map_err(at(Stage::Analyze))?;
        let utilization = UtilizationReport::parse(report.text());
        let detail = utilization.to_string();
        run.utilization = Some(utilization.clone());
        self.complete(run, Stage::Analyze, StageStatus::Succeeded, detail);

        // Score
        let score = scorer::score(
            elapsed.as_secs_f64(),
            utilization.raw(),
            &self.config.scoring.resource_key,
        )
        .map_err(at(Stage::Score))?;
        let status = if score.defaulted {
            StageStatus::Warned
        } else {
            StageStatus::Succeeded
        };
        self.complete(run, Stage::Score, status, score.to_string());
        Ok(score)
    }

    fn inject(&self, program: &Program) -> PipelineResult<PatchOutcome> {
        let lines = encode_program(program, self.config.patch.encoding);
        Ok(patcher::patch(&self.config.patch_target(), &lines)?)
    }

    async fn build(&self) -> PipelineResult<BuildResult> {
        let build = &self.config.build;
        Ok(self
            .builder
            .build(&self.config.hardware_dir, &build.command, build.timeout())
            .await?)
    }

    async fn measure(&self) -> PipelineResult<std::time::Duration> {
        let monitor = &self.config.monitor;
        let mut channel = (self.channels)().map_err(MonitorError::Channel)?;
        Ok(self
            .monitor
            .wait_for_completion(channel.as_mut(), monitor.sentinel, monitor.timeout())
            .await?)
    }

    fn complete(&self, run: &mut RunBuilder, stage: Stage, status: StageStatus, detail: String) {
        info!(stage = %stage, status = ?status, "{}", detail);
        run.record(stage, status, detail);
    }
}

/// The stage after the last one that produced an outcome.
fn next_stage(run: &RunBuilder) -> Stage {
    match run.last_stage() {
        None => Stage::Inject,
        Some(last) => Stage::ALL
            .iter()
            .copied()
            .find(|s| *s > last)
            .unwrap_or(last),
    }
}

fn fail(mut run: RunBuilder, stage: Stage, reason: PipelineError) -> RunFailure {
    error!(stage = %stage, error = %reason, "Benchmark run failed");
    run.record(stage, StageStatus::Failed, reason.to_string());
    RunFailure {
        stage,
        reason,
        partial: Box::new(run),
    }
}
