//! Records produced by the build and toolchain stages.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Build Result ────────────────────────────────────────────────────

/// Outcome of one build attempt.
///
/// A non-zero exit is data, not an error: the caller decides whether to
/// continue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    /// Process exit code; `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl BuildResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// The last `n` lines of output, stdout first then stderr.
    pub fn tail(&self, n: usize) -> Vec<&str> {
        let lines: Vec<&str> = self.stdout.lines().chain(self.stderr.lines()).collect();
        let skip = lines.len().saturating_sub(n);
        lines.into_iter().skip(skip).collect()
    }
}

impl std::fmt::Display for BuildResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "Build(exit={}, {:.1}s)", code, self.duration.as_secs_f64()),
            None => write!(f, "Build(killed, {:.1}s)", self.duration.as_secs_f64()),
        }
    }
}

// ── Synthesis Artifact ──────────────────────────────────────────────

/// A bitstream produced by synthesis plus the log that accompanies it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisArtifact {
    pub bitstream: PathBuf,
    pub log: PathBuf,
    pub top_module: String,
    pub part_number: String,
    /// Human-readable summary reported by the backend.
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Display for SynthesisArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Bitstream({}, top={}, part={})",
            self.bitstream.display(),
            self.top_module,
            self.part_number
        )
    }
}

// ── Flash Confirmation ──────────────────────────────────────────────

/// Acknowledgement that a device was programmed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashConfirmation {
    pub bitstream: PathBuf,
    pub device_id: String,
    pub message: String,
}

impl std::fmt::Display for FlashConfirmation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
