//! Benchmark runs: the per-stage record threaded through the pipeline.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifact::{duration_serde, BuildResult, FlashConfirmation, SynthesisArtifact};
use crate::program::Program;
use crate::report::UtilizationReport;

// ── Identifiers ─────────────────────────────────────────────────────

/// Unique identifier for a benchmark run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run:{}", self.0)
    }
}

// ── Stages ──────────────────────────────────────────────────────────

/// Pipeline stages, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Inject,
    Build,
    Synthesize,
    Flash,
    Measure,
    Analyze,
    Score,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Self::Inject,
        Self::Build,
        Self::Synthesize,
        Self::Flash,
        Self::Measure,
        Self::Analyze,
        Self::Score,
    ];
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inject => write!(f, "inject"),
            Self::Build => write!(f, "build"),
            Self::Synthesize => write!(f, "synthesize"),
            Self::Flash => write!(f, "flash"),
            Self::Measure => write!(f, "measure"),
            Self::Analyze => write!(f, "analyze"),
            Self::Score => write!(f, "score"),
        }
    }
}

/// How a stage ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Succeeded,
    /// Completed with a problem the run policy tolerated.
    Warned,
    Failed,
}

/// One line of the per-stage outcome log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: Stage,
    pub status: StageStatus,
    pub detail: String,
    pub recorded_at: DateTime<Utc>,
}

// ── Score ───────────────────────────────────────────────────────────

/// Composite design-quality score and the inputs that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub value: f64,
    pub elapsed_seconds: f64,
    pub resource_key: String,
    /// Utilization actually used in the formula, after defaulting/clamping.
    pub utilization_percent: u32,
    /// The key was absent from the report and the worst case was assumed.
    pub defaulted: bool,
    /// The report stated 0% and the floor was applied.
    pub clamped: bool,
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.2} (time={:.4}s, {}={}%)",
            self.value, self.elapsed_seconds, self.resource_key, self.utilization_percent
        )
    }
}

// ── Run Builder ─────────────────────────────────────────────────────

/// A run in progress. Stages fill their slot; [`RunBuilder::finish`]
/// seals it into a read-only [`BenchmarkRun`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunBuilder {
    pub id: RunId,
    pub program: Program,
    pub started_at: DateTime<Utc>,
    pub build: Option<BuildResult>,
    pub artifact: Option<SynthesisArtifact>,
    pub flash: Option<FlashConfirmation>,
    #[serde(default, with = "opt_duration_serde")]
    pub elapsed: Option<Duration>,
    pub utilization: Option<UtilizationReport>,
    pub stages: Vec<StageOutcome>,
}

impl RunBuilder {
    pub fn new(program: Program) -> Self {
        Self {
            id: RunId::new(),
            program,
            started_at: Utc::now(),
            build: None,
            artifact: None,
            flash: None,
            elapsed: None,
            utilization: None,
            stages: Vec::new(),
        }
    }

    /// Append to the outcome log.
    pub fn record(&mut self, stage: Stage, status: StageStatus, detail: impl Into<String>) {
        self.stages.push(StageOutcome {
            stage,
            status,
            detail: detail.into(),
            recorded_at: Utc::now(),
        });
    }

    /// The last stage that reached an outcome, if any.
    pub fn last_stage(&self) -> Option<Stage> {
        self.stages.last().map(|o| o.stage)
    }

    /// Seal the run. Fails with the first stage whose output is missing.
    pub fn finish(self, score: Score) -> Result<BenchmarkRun, Stage> {
        let build = self.build.ok_or(Stage::Build)?;
        let artifact = self.artifact.ok_or(Stage::Synthesize)?;
        let flash = self.flash.ok_or(Stage::Flash)?;
        let elapsed = self.elapsed.ok_or(Stage::Measure)?;
        let utilization = self.utilization.ok_or(Stage::Analyze)?;
        Ok(BenchmarkRun {
            id: self.id,
            program: self.program,
            build,
            artifact,
            flash,
            elapsed,
            utilization,
            score,
            stages: self.stages,
            started_at: self.started_at,
            finished_at: Utc::now(),
        })
    }
}

// ── Benchmark Run ───────────────────────────────────────────────────

/// A completed, scored benchmark run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BenchmarkRun {
    id: RunId,
    program: Program,
    build: BuildResult,
    artifact: SynthesisArtifact,
    flash: FlashConfirmation,
    #[serde(with = "duration_serde")]
    elapsed: Duration,
    utilization: UtilizationReport,
    score: Score,
    stages: Vec<StageOutcome>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl BenchmarkRun {
    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn build(&self) -> &BuildResult {
        &self.build
    }

    pub fn artifact(&self) -> &SynthesisArtifact {
        &self.artifact
    }

    pub fn flash(&self) -> &FlashConfirmation {
        &self.flash
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn utilization(&self) -> &UtilizationReport {
        &self.utilization
    }

    pub fn score(&self) -> &Score {
        &self.score
    }

    pub fn stages(&self) -> &[StageOutcome] {
        &self.stages
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }
}

impl std::fmt::Display for BenchmarkRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Run({}, {}, score={})", self.id, self.program.name(), self.score)
    }
}

mod opt_duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.map(|d| d.as_millis()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Instruction;
    use std::path::PathBuf;

    fn program() -> Program {
        Program::new("halt", vec![Instruction::new(0x6F, "JAL x0, 0")]).unwrap()
    }

    fn score() -> Score {
        Score {
            value: 2000.0,
            elapsed_seconds: 1.0,
            resource_key: "LUT".into(),
            utilization_percent: 50,
            defaulted: false,
            clamped: false,
        }
    }

    fn filled() -> RunBuilder {
        let mut b = RunBuilder::new(program());
        b.build = Some(BuildResult {
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::from_secs(1),
        });
        b.artifact = Some(SynthesisArtifact {
            bitstream: PathBuf::from("build/Top.bit"),
            log: PathBuf::from("build/synth.log"),
            top_module: "Top".into(),
            part_number: "xc7a100tcsg324-1".into(),
            summary: "ok".into(),
            created_at: Utc::now(),
        });
        b.flash = Some(FlashConfirmation {
            bitstream: PathBuf::from("build/Top.bit"),
            device_id: "default".into(),
            message: "flashed".into(),
        });
        b.elapsed = Some(Duration::from_millis(1234));
        b.utilization = Some(UtilizationReport::parse("LUT: 50%"));
        b
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
        assert!(RunId::new().to_string().starts_with("run:"));
    }

    #[test]
    fn stages_are_ordered() {
        let mut sorted = Stage::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, Stage::ALL.to_vec());
        assert_eq!(Stage::Synthesize.to_string(), "synthesize");
    }

    #[test]
    fn finish_reports_first_missing_stage() {
        let mut b = filled();
        b.flash = None;
        b.utilization = None;
        assert_eq!(b.finish(score()).unwrap_err(), Stage::Flash);

        assert_eq!(
            RunBuilder::new(program()).finish(score()).unwrap_err(),
            Stage::Build
        );
    }

    #[test]
    fn finish_seals_run() {
        let mut b = filled();
        b.record(Stage::Inject, StageStatus::Succeeded, "patched");
        assert_eq!(b.last_stage(), Some(Stage::Inject));

        let run = b.finish(score()).unwrap();
        assert_eq!(run.elapsed(), Duration::from_millis(1234));
        assert_eq!(run.score().value, 2000.0);
        assert_eq!(run.stages().len(), 1);
        assert!(run.finished_at() >= run.started_at());
        assert!(run.to_string().contains("halt"));
    }

    #[test]
    fn run_serializes() {
        let run = filled().finish(score()).unwrap();
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["elapsed"], 1234);
        assert_eq!(json["score"]["resource_key"], "LUT");
    }

    #[test]
    fn score_display() {
        assert_eq!(score().to_string(), "2000.00 (time=1.0000s, LUT=50%)");
    }
}
