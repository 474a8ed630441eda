//! Pipeline configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use benchloop_types::PatchTarget;
use serde::{Deserialize, Serialize};

use crate::build::BuildCommand;
use crate::encoder::EncodeOptions;
use crate::monitor::MonitorConfig;
use crate::scorer::DEFAULT_RESOURCE_KEY;

/// Everything a pipeline run needs besides its collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root of the hardware project. Relative paths below resolve here.
    #[serde(default = "default_hardware_dir")]
    pub hardware_dir: PathBuf,

    /// Program injection
    #[serde(default)]
    pub patch: PatchConfig,

    /// HDL generation
    #[serde(default)]
    pub build: BuildConfig,

    /// Synthesis and flashing
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Completion timing
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Scoring
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Upper bound for a whole run in seconds
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            hardware_dir: default_hardware_dir(),
            patch: PatchConfig::default(),
            build: BuildConfig::default(),
            synthesis: SynthesisConfig::default(),
            monitor: MonitorConfig::default(),
            scoring: ScoringConfig::default(),
            run_timeout_secs: default_run_timeout(),
        }
    }
}

impl PipelineConfig {
    /// Resolve `path` against the hardware directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.hardware_dir.join(path)
        }
    }

    pub fn patch_target(&self) -> PatchTarget {
        PatchTarget::new(
            self.resolve(&self.patch.file),
            self.patch.start_marker.clone(),
            self.patch.end_marker.clone(),
        )
    }

    pub fn hdl_paths(&self) -> Vec<PathBuf> {
        self.synthesis
            .hdl_files
            .iter()
            .map(|p| self.resolve(p))
            .collect()
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

/// Where and how the program is written into the design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchConfig {
    /// Source file holding the instruction memory initializer
    #[serde(default = "default_patch_file")]
    pub file: PathBuf,

    #[serde(default = "default_start_marker")]
    pub start_marker: String,

    #[serde(default = "default_end_marker")]
    pub end_marker: String,

    /// Literal format of each entry
    #[serde(default)]
    pub encoding: EncodeOptions,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            file: default_patch_file(),
            start_marker: default_start_marker(),
            end_marker: default_end_marker(),
            encoding: EncodeOptions::default(),
        }
    }
}

/// What to do when the build exits unsuccessfully.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildFailurePolicy {
    /// Stop the run with a build failure.
    #[default]
    Abort,
    /// Log a warning and synthesize whatever HDL is on disk.
    Continue,
}

/// HDL generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub command: BuildCommand,

    #[serde(default = "default_build_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub on_failure: BuildFailurePolicy,

    /// Output lines kept when reporting a failed build
    #[serde(default = "default_tail_lines")]
    pub tail_lines: usize,
}

impl BuildConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: BuildCommand::default(),
            timeout_secs: default_build_timeout(),
            on_failure: BuildFailurePolicy::default(),
            tail_lines: default_tail_lines(),
        }
    }
}

/// Synthesis and device programming settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Generated HDL handed to synthesis
    #[serde(default = "default_hdl_files")]
    pub hdl_files: Vec<PathBuf>,

    #[serde(default = "default_top_module")]
    pub top_module: String,

    #[serde(default = "default_part_number")]
    pub part_number: String,

    /// Target device; the backend's default device when unset
    #[serde(default)]
    pub device_id: Option<String>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            hdl_files: default_hdl_files(),
            top_module: default_top_module(),
            part_number: default_part_number(),
            device_id: None,
        }
    }
}

/// Scoring settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Resource whose utilization enters the score
    #[serde(default = "default_resource_key")]
    pub resource_key: String,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            resource_key: default_resource_key(),
        }
    }
}

// Default value helpers
fn default_hardware_dir() -> PathBuf {
    PathBuf::from("hardware")
}

fn default_patch_file() -> PathBuf {
    PathBuf::from("src/main/scala/cpu/Memory.scala")
}

fn default_start_marker() -> String {
    "val program = VecInit(Seq(".to_string()
}

fn default_end_marker() -> String {
    "))".to_string()
}

fn default_build_timeout() -> u64 {
    600
}

fn default_tail_lines() -> usize {
    20
}

fn default_hdl_files() -> Vec<PathBuf> {
    vec![PathBuf::from("generated/Top.v")]
}

fn default_top_module() -> String {
    "Top".to_string()
}

fn default_part_number() -> String {
    "xc7a100tcsg324-1".to_string()
}

fn default_resource_key() -> String {
    DEFAULT_RESOURCE_KEY.to_string()
}

fn default_run_timeout() -> u64 {
    3600
}
