//! Backend selection and per-backend settings.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which gateway implementation to construct.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process mock that writes placeholder artifacts.
    #[default]
    Mock,
    /// Xilinx Vivado in batch mode.
    Vivado,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mock => write!(f, "mock"),
            Self::Vivado => write!(f, "vivado"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "vivado" => Ok(Self::Vivado),
            other => Err(format!("Unknown toolchain backend: {}", other)),
        }
    }
}

/// Toolchain configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Backend to use.
    #[serde(default)]
    pub backend: BackendKind,

    /// Directory receiving bitstreams, logs, scripts and reports.
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    /// Upper bound for a single synthesize/flash/verify call.
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    /// Mock backend settings.
    #[serde(default)]
    pub mock: MockConfig,

    /// Vivado backend settings.
    #[serde(default)]
    pub vivado: VivadoConfig,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            build_dir: default_build_dir(),
            tool_timeout_secs: default_tool_timeout(),
            mock: MockConfig::default(),
            vivado: VivadoConfig::default(),
        }
    }
}

/// Mock backend settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MockConfig {
    /// Contents written to the utilization report on synthesis.
    #[serde(default = "default_mock_utilization")]
    pub utilization_report: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            utilization_report: default_mock_utilization(),
        }
    }
}

/// Vivado backend settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VivadoConfig {
    /// Vivado executable (name on PATH or absolute path).
    #[serde(default = "default_vivado_executable")]
    pub executable: String,

    /// Hardware server used when programming devices.
    #[serde(default = "default_hw_server")]
    pub hw_server_url: String,
}

impl Default for VivadoConfig {
    fn default() -> Self {
        Self {
            executable: default_vivado_executable(),
            hw_server_url: default_hw_server(),
        }
    }
}

// Default value helpers
fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_tool_timeout() -> u64 {
    1800
}

fn default_mock_utilization() -> String {
    "Utilization Report\nLUT: 45%\nFF: 30%\nBRAM: 10%".to_string()
}

fn default_vivado_executable() -> String {
    "vivado".to_string()
}

fn default_hw_server() -> String {
    "localhost:3121".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ToolchainConfig::default();
        assert_eq!(config.backend, BackendKind::Mock);
        assert_eq!(config.build_dir, PathBuf::from("build"));
        assert_eq!(config.tool_timeout_secs, 1800);
        assert!(config.mock.utilization_report.contains("LUT: 45%"));
        assert_eq!(config.vivado.executable, "vivado");
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!("Vivado".parse::<BackendKind>().unwrap(), BackendKind::Vivado);
        assert_eq!("mock".parse::<BackendKind>().unwrap(), BackendKind::Mock);
        assert!("quartus".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_partial_deserialize() {
        let config: ToolchainConfig =
            serde_json::from_str(r#"{"backend":"vivado","vivado":{"executable":"/opt/vivado"}}"#)
                .unwrap();
        assert_eq!(config.backend, BackendKind::Vivado);
        assert_eq!(config.vivado.executable, "/opt/vivado");
        assert_eq!(config.vivado.hw_server_url, "localhost:3121");
        assert_eq!(config.tool_timeout_secs, 1800);
    }
}
