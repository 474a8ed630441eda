//! Analysis metric kinds and the utilization report.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A name that does not belong to a closed set of kinds.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseKindError {
    pub kind: &'static str,
    pub value: String,
}

// ── Metric Kind ─────────────────────────────────────────────────────

/// Metrics the toolchain can analyze.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Timing,
    Power,
    Utilization,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [Self::Timing, Self::Power, Self::Utilization];
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timing => write!(f, "timing"),
            Self::Power => write!(f, "power"),
            Self::Utilization => write!(f, "utilization"),
        }
    }
}

impl FromStr for MetricKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "timing" => Ok(Self::Timing),
            "power" => Ok(Self::Power),
            "utilization" => Ok(Self::Utilization),
            other => Err(ParseKindError {
                kind: "metric",
                value: other.to_string(),
            }),
        }
    }
}

// ── Simulation Kind ─────────────────────────────────────────────────

/// Level of detail for a testbench verification run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimulationKind {
    #[default]
    Behavioral,
    PostSynthesis,
    PostImplementation,
}

impl std::fmt::Display for SimulationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Behavioral => write!(f, "behavioral"),
            Self::PostSynthesis => write!(f, "post-synthesis"),
            Self::PostImplementation => write!(f, "post-implementation"),
        }
    }
}

impl FromStr for SimulationKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "behavioral" => Ok(Self::Behavioral),
            "post-synthesis" => Ok(Self::PostSynthesis),
            "post-implementation" => Ok(Self::PostImplementation),
            other => Err(ParseKindError {
                kind: "simulation type",
                value: other.to_string(),
            }),
        }
    }
}

// ── Utilization Report ──────────────────────────────────────────────

fn entry_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\b([A-Za-z][A-Za-z0-9_]*): ?(\d+)%").ok())
        .as_ref()
}

/// What a report says about one resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PercentageLookup {
    Found(u32),
    /// The key appears but its value does not fit a percentage.
    Unreadable(String),
    Missing,
}

impl PercentageLookup {
    fn from_digits(digits: &str) -> Self {
        match digits.parse::<u32>() {
            Ok(value) => Self::Found(value),
            Err(_) => Self::Unreadable(digits.to_string()),
        }
    }

    pub fn value(&self) -> Option<u32> {
        match self {
            Self::Found(value) => Some(*value),
            _ => None,
        }
    }
}

/// The first `KEY: N%` entry for `key` in `text`.
///
/// The key is matched literally and must start on a word boundary. At most
/// one space may separate the colon from the digits.
pub fn lookup_percentage(text: &str, key: &str) -> PercentageLookup {
    let pattern = format!(r"\b{}: ?(\d+)%", regex::escape(key));
    let Ok(re) = Regex::new(&pattern) else {
        return PercentageLookup::Missing;
    };
    match re.captures(text).and_then(|caps| caps.get(1)) {
        Some(digits) => PercentageLookup::from_digits(digits.as_str()),
        None => PercentageLookup::Missing,
    }
}

/// Resource usage percentages keyed by resource kind (`LUT`, `FF`, ...).
///
/// Keeps the raw text it was parsed from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilizationReport {
    raw: String,
    resources: BTreeMap<String, u32>,
}

impl UtilizationReport {
    /// Parse every `KEY: N%` entry in the text.
    ///
    /// The first occurrence of a key wins, as in [`lookup_percentage`]. A key
    /// whose first value is unreadable is left out.
    pub fn parse(text: impl Into<String>) -> Self {
        let raw = text.into();
        let mut first: BTreeMap<String, PercentageLookup> = BTreeMap::new();
        if let Some(re) = entry_pattern() {
            for caps in re.captures_iter(&raw) {
                first
                    .entry(caps[1].to_string())
                    .or_insert_with(|| PercentageLookup::from_digits(&caps[2]));
            }
        }
        let resources = first
            .into_iter()
            .filter_map(|(key, lookup)| Some((key, lookup.value()?)))
            .collect();
        Self { raw, resources }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn percentage(&self, resource: &str) -> Option<u32> {
        self.resources.get(resource).copied()
    }

    pub fn resources(&self) -> &BTreeMap<String, u32> {
        &self.resources
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl std::fmt::Display for UtilizationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .resources
            .iter()
            .map(|(k, v)| format!("{}={}%", k, v))
            .collect();
        write!(f, "Utilization({})", parts.join(", "))
    }
}
