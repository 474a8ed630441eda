//! Configuration for the benchloop CLI
//!
//! Layered as built-in defaults, then an optional file, then
//! `BENCHLOOP_`-prefixed environment variables. Nested keys use `__`,
//! e.g. `BENCHLOOP_TOOLCHAIN__BACKEND=vivado`.

use std::path::PathBuf;

use benchloop_core::{
    BuildConfig, MonitorConfig, PatchConfig, PipelineConfig, ScoringConfig, SerialConfig,
    SynthesisConfig,
};
use benchloop_toolchain::ToolchainConfig;
use serde::{Deserialize, Serialize};

/// Main CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Root of the hardware project
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

    /// Toolchain backend
    #[serde(default)]
    pub toolchain: ToolchainConfig,

    /// Completion timing
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Completion signal source
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Scoring
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Upper bound for a whole run in seconds
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            hardware_dir: pipeline.hardware_dir,
            patch: pipeline.patch,
            build: pipeline.build,
            synthesis: pipeline.synthesis,
            toolchain: ToolchainConfig::default(),
            monitor: pipeline.monitor,
            completion: CompletionConfig::default(),
            scoring: pipeline.scoring,
            run_timeout_secs: pipeline.run_timeout_secs,
            logging: LoggingConfig::default(),
        }
    }
}

/// Where the completion byte comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Serial or status device, e.g. `/dev/ttyUSB0`
    #[serde(default)]
    pub device: Option<PathBuf>,

    /// Line settings used when `device` is a serial port
    #[serde(default)]
    pub serial: SerialConfig,

    /// Simulated execution time used with the mock backend
    #[serde(default = "default_mock_delay")]
    pub mock_delay_ms: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            device: None,
            serial: SerialConfig::default(),
            mock_delay_ms: default_mock_delay(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_hardware_dir() -> PathBuf {
    PipelineConfig::default().hardware_dir
}

fn default_run_timeout() -> u64 {
    PipelineConfig::default().run_timeout_secs
}

fn default_mock_delay() -> u64 {
    1234
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl BenchConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&BenchConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        // Add environment variables with BENCHLOOP_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("BENCHLOOP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// The library-side pipeline configuration
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            hardware_dir: self.hardware_dir.clone(),
            patch: self.patch.clone(),
            build: self.build.clone(),
            synthesis: self.synthesis.clone(),
            monitor: self.monitor.clone(),
            scoring: self.scoring.clone(),
            run_timeout_secs: self.run_timeout_secs,
        }
    }

    /// Lock file guarding the hardware directory
    pub fn lock_path(&self) -> PathBuf {
        self.hardware_dir.join(".benchloop.lock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchloop_toolchain::BackendKind;

    #[test]
    fn test_default_config() {
        let config = BenchConfig::default();
        assert_eq!(config.hardware_dir, PathBuf::from("hardware"));
        assert_eq!(config.toolchain.backend, BackendKind::Mock);
        assert_eq!(config.completion.mock_delay_ms, 1234);
        assert!(config.completion.device.is_none());
        assert_eq!(config.completion.serial.baud_rate, 115_200);
        assert_eq!(config.run_timeout_secs, 3600);
    }

    #[test]
    fn test_serial_settings_from_yaml() {
        let yaml = "completion:\n  device: /dev/ttyUSB1\n  serial:\n    baud_rate: 9600\n";
        let config: BenchConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.completion.device, Some(PathBuf::from("/dev/ttyUSB1")));
        assert_eq!(config.completion.serial.baud_rate, 9600);
        assert_eq!(config.completion.serial.read_timeout_ms, 50);
    }

    #[test]
    fn test_pipeline_conversion() {
        let mut config = BenchConfig::default();
        config.hardware_dir = PathBuf::from("/work/cpu");
        config.scoring.resource_key = "FF".into();
        let pipeline = config.pipeline();
        assert_eq!(pipeline.hardware_dir, PathBuf::from("/work/cpu"));
        assert_eq!(pipeline.scoring.resource_key, "FF");
        assert_eq!(config.lock_path(), PathBuf::from("/work/cpu/.benchloop.lock"));
    }

    #[test]
    fn test_yaml_roundtrip_keeps_sections() {
        let yaml = serde_yaml::to_string(&BenchConfig::default()).unwrap();
        assert!(yaml.contains("toolchain:"));
        assert!(yaml.contains("part_number: xc7a100tcsg324-1"));
        let back: BenchConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.synthesis.top_module, "Top");
    }
}
