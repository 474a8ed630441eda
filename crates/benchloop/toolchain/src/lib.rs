//! # benchloop-toolchain
//!
//! Narrow contract to the external FPGA toolchain: synthesize HDL into a
//! bitstream, program a device, and report timing, power or utilization.
//!
//! Backends:
//! - [`MockToolchain`] writes placeholder artifacts and canned reports.
//! - [`VivadoToolchain`] drives Vivado in batch mode through generated TCL.
//!
//! Use [`from_config`] to construct the backend named in configuration.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod gateway;
pub mod mock;
mod process;
pub mod vivado;

use std::time::Duration;

// ── Re-exports ──────────────────────────────────────────────────────

pub use config::{BackendKind, MockConfig, ToolchainConfig, VivadoConfig};
pub use error::{ToolchainError, ToolchainResult};
pub use gateway::{
    report_file, AnalysisReport, GatewayState, GatewayStatus, ToolchainGateway,
    VerificationReport, POWER_REPORT, TIMING_REPORT, UTILIZATION_REPORT,
};
pub use mock::MockToolchain;
pub use vivado::VivadoToolchain;

/// Construct the gateway selected by `config.backend`.
pub fn from_config(config: &ToolchainConfig) -> Box<dyn ToolchainGateway> {
    match config.backend {
        BackendKind::Mock => Box::new(MockToolchain::with_config(
            config.build_dir.clone(),
            config.mock.clone(),
        )),
        BackendKind::Vivado => Box::new(VivadoToolchain::new(
            config.build_dir.clone(),
            config.vivado.clone(),
            Duration::from_secs(config.tool_timeout_secs),
        )),
    }
}
