//! Mock toolchain: writes placeholder artifacts and canned reports.
//!
//! Synthesis produces a real file on disk so the normal flash resolution
//! rules apply, and report files so `analyze` surfaces them the same way a
//! real backend would.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use benchloop_types::{FlashConfirmation, MetricKind, SimulationKind, SynthesisArtifact};
use chrono::Utc;
use tracing::{debug, info};

use crate::config::MockConfig;
use crate::error::ToolchainResult;
use crate::gateway::{
    report_file, AnalysisReport, GatewayState, GatewayStatus, ToolchainGateway,
    VerificationReport, POWER_REPORT, TIMING_REPORT, UTILIZATION_REPORT,
};

const MOCK_TIMING: &str = "Timing constraints met. Worst Negative Slack: 0.5ns";
const MOCK_POWER: &str = "Power analysis complete: 1.7W Total";
const MOCK_UTILIZATION: &str = "LUT: 45%, FF: 30%, BRAM: 10%";
const MOCK_SYNTH_LOG: &str = "Synthesis complete. 0 Errors. 5 Warnings.";

/// In-process toolchain for development and tests.
pub struct MockToolchain {
    build_dir: PathBuf,
    config: MockConfig,
    state: GatewayState,
}

impl MockToolchain {
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self::with_config(build_dir, MockConfig::default())
    }

    pub fn with_config(build_dir: impl Into<PathBuf>, config: MockConfig) -> Self {
        Self {
            build_dir: build_dir.into(),
            config,
            state: GatewayState::new(),
        }
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    fn canned(metric: MetricKind) -> &'static str {
        match metric {
            MetricKind::Timing => MOCK_TIMING,
            MetricKind::Power => MOCK_POWER,
            MetricKind::Utilization => MOCK_UTILIZATION,
        }
    }
}

#[async_trait]
impl ToolchainGateway for MockToolchain {
    async fn synthesize(
        &self,
        hdl_files: &[PathBuf],
        top_module: &str,
        part_number: &str,
    ) -> ToolchainResult<SynthesisArtifact> {
        info!(
            top_module,
            part_number,
            sources = hdl_files.len(),
            "Synthesizing (mock)"
        );

        std::fs::create_dir_all(&self.build_dir)?;
        let bitstream = self.build_dir.join(format!("{}.bit", top_module));
        let log = self.build_dir.join("synthesis.log");
        std::fs::write(&bitstream, "mock bitstream")?;
        std::fs::write(&log, MOCK_SYNTH_LOG)?;
        std::fs::write(
            self.build_dir.join(UTILIZATION_REPORT),
            &self.config.utilization_report,
        )?;
        std::fs::write(self.build_dir.join(TIMING_REPORT), MOCK_TIMING)?;
        std::fs::write(self.build_dir.join(POWER_REPORT), MOCK_POWER)?;

        let artifact = SynthesisArtifact {
            summary: format!(
                "Synthesis successful. Bitstream generated at {}. Log: {}",
                bitstream.display(),
                MOCK_SYNTH_LOG
            ),
            bitstream,
            log,
            top_module: top_module.to_string(),
            part_number: part_number.to_string(),
            created_at: Utc::now(),
        };
        self.state
            .remember_synthesis(&artifact, hdl_files, MOCK_SYNTH_LOG.to_string())?;
        Ok(artifact)
    }

    async fn flash(
        &self,
        bitstream: &Path,
        device_id: Option<&str>,
    ) -> ToolchainResult<FlashConfirmation> {
        let resolved = self.state.resolve_bitstream(bitstream)?;
        let device = device_id.unwrap_or("default").to_string();
        debug!(bitstream = %resolved.display(), device = %device, "Flashing (mock)");
        Ok(FlashConfirmation {
            message: format!(
                "Device {} successfully flashed with {}.",
                device,
                bitstream.display()
            ),
            bitstream: resolved,
            device_id: device,
        })
    }

    async fn analyze(&self, metric: &str) -> ToolchainResult<AnalysisReport> {
        let metric = match metric.parse::<MetricKind>() {
            Ok(m) => m,
            Err(_) => return Ok(AnalysisReport::UnknownMetric(metric.to_string())),
        };
        let path = self.build_dir.join(report_file(metric));
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => Self::canned(metric).to_string(),
        };
        Ok(AnalysisReport::Report { metric, text })
    }

    async fn verify(
        &self,
        testbench: &Path,
        kind: SimulationKind,
    ) -> ToolchainResult<VerificationReport> {
        let report = VerificationReport {
            testbench: testbench.to_path_buf(),
            kind,
            passed: true,
            summary: "Testbench passed. 100/100 tests passed.".to_string(),
        };
        self.state.record_verification(&report)?;
        Ok(report)
    }

    fn synthesis_log(&self) -> ToolchainResult<Option<String>> {
        self.state.last_log()
    }

    fn status(&self) -> ToolchainResult<GatewayStatus> {
        self.state.snapshot(self.name())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
