//! The toolchain gateway contract and state shared by its backends.
//!
//! A gateway instance remembers what it produced (bitstreams, logs,
//! verification results). Nothing is process-wide: two gateways never see
//! each other's artifacts.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use benchloop_types::{FlashConfirmation, MetricKind, SimulationKind, SynthesisArtifact};
use serde::{Deserialize, Serialize};

use crate::error::{ToolchainError, ToolchainResult};

/// Report file names written into the build directory.
pub const UTILIZATION_REPORT: &str = "post_route_util.rpt";
pub const TIMING_REPORT: &str = "post_route_timing.rpt";
pub const POWER_REPORT: &str = "post_route_power.rpt";

/// Report file for a metric.
pub fn report_file(metric: MetricKind) -> &'static str {
    match metric {
        MetricKind::Timing => TIMING_REPORT,
        MetricKind::Power => POWER_REPORT,
        MetricKind::Utilization => UTILIZATION_REPORT,
    }
}

// ── Results ─────────────────────────────────────────────────────────

/// Result of an `analyze` call.
///
/// An unrecognized metric name is a normal result, not a fault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisReport {
    Report { metric: MetricKind, text: String },
    UnknownMetric(String),
}

impl AnalysisReport {
    pub fn text(&self) -> String {
        self.to_string()
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Report { .. })
    }
}

impl std::fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Report { text, .. } => f.write_str(text),
            Self::UnknownMetric(name) => write!(f, "Unknown metric: {}", name),
        }
    }
}

/// Result of a testbench verification run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub testbench: PathBuf,
    pub kind: SimulationKind,
    pub passed: bool,
    pub summary: String,
}

impl std::fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.testbench.display(), self.kind, self.summary)
    }
}

/// Snapshot of what a gateway instance has produced so far.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayStatus {
    pub backend: String,
    pub last_bitstream: Option<PathBuf>,
    pub last_synthesis_log: Option<String>,
    pub verification_results: BTreeMap<String, VerificationReport>,
}

// ── Gateway Trait ───────────────────────────────────────────────────

/// External toolchain: synthesis, device programming and analysis.
#[async_trait]
pub trait ToolchainGateway: Send + Sync {
    /// Synthesize HDL sources into a bitstream a later `flash` can resolve.
    async fn synthesize(
        &self,
        hdl_files: &[PathBuf],
        top_module: &str,
        part_number: &str,
    ) -> ToolchainResult<SynthesisArtifact>;

    /// Program a device. Fails with `ArtifactNotFound` when the path does
    /// not exist and is not a bitstream this gateway produced.
    async fn flash(
        &self,
        bitstream: &Path,
        device_id: Option<&str>,
    ) -> ToolchainResult<FlashConfirmation>;

    /// Report on `timing`, `power` or `utilization`.
    async fn analyze(&self, metric: &str) -> ToolchainResult<AnalysisReport>;

    /// Run a testbench simulation.
    async fn verify(
        &self,
        testbench: &Path,
        kind: SimulationKind,
    ) -> ToolchainResult<VerificationReport>;

    /// The most recent synthesis log, if synthesis has run.
    fn synthesis_log(&self) -> ToolchainResult<Option<String>>;

    /// Summary of this instance's state.
    fn status(&self) -> ToolchainResult<GatewayStatus>;

    /// Backend name.
    fn name(&self) -> &str;
}

// ── Shared State ────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct StateInner {
    last_artifact: Option<SynthesisArtifact>,
    last_log: Option<String>,
    last_sources: Vec<PathBuf>,
    known_bitstreams: HashSet<PathBuf>,
    verification: BTreeMap<String, VerificationReport>,
}

/// Per-instance memory of produced artifacts.
#[derive(Debug, Default)]
pub struct GatewayState {
    inner: RwLock<StateInner>,
}

impl GatewayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember_synthesis(
        &self,
        artifact: &SynthesisArtifact,
        sources: &[PathBuf],
        log: String,
    ) -> ToolchainResult<()> {
        let mut inner = self.inner.write().map_err(|_| ToolchainError::LockPoisoned)?;
        inner.known_bitstreams.insert(artifact.bitstream.clone());
        inner.last_artifact = Some(artifact.clone());
        inner.last_sources = sources.to_vec();
        inner.last_log = Some(log);
        Ok(())
    }

    pub fn record_verification(&self, report: &VerificationReport) -> ToolchainResult<()> {
        let mut inner = self.inner.write().map_err(|_| ToolchainError::LockPoisoned)?;
        inner
            .verification
            .insert(report.testbench.display().to_string(), report.clone());
        Ok(())
    }

    /// Resolve a flash target to a concrete path.
    ///
    /// Existing paths resolve to themselves. Otherwise the path must equal a
    /// bitstream this gateway produced, or that bitstream's file name.
    pub fn resolve_bitstream(&self, requested: &Path) -> ToolchainResult<PathBuf> {
        if requested.exists() {
            return Ok(requested.to_path_buf());
        }
        let inner = self.inner.read().map_err(|_| ToolchainError::LockPoisoned)?;
        if inner.known_bitstreams.contains(requested) {
            return Ok(requested.to_path_buf());
        }
        inner
            .known_bitstreams
            .iter()
            .find(|known| known.file_name() == Some(requested.as_os_str()))
            .cloned()
            .ok_or_else(|| ToolchainError::ArtifactNotFound(requested.to_path_buf()))
    }

    pub fn last_sources(&self) -> ToolchainResult<Vec<PathBuf>> {
        let inner = self.inner.read().map_err(|_| ToolchainError::LockPoisoned)?;
        Ok(inner.last_sources.clone())
    }

    pub fn last_log(&self) -> ToolchainResult<Option<String>> {
        let inner = self.inner.read().map_err(|_| ToolchainError::LockPoisoned)?;
        Ok(inner.last_log.clone())
    }

    pub fn snapshot(&self, backend: &str) -> ToolchainResult<GatewayStatus> {
        let inner = self.inner.read().map_err(|_| ToolchainError::LockPoisoned)?;
        Ok(GatewayStatus {
            backend: backend.to_string(),
            last_bitstream: inner.last_artifact.as_ref().map(|a| a.bitstream.clone()),
            last_synthesis_log: inner.last_log.clone(),
            verification_results: inner.verification.clone(),
        })
    }
}
