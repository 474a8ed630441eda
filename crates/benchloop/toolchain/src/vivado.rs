//! Vivado batch-mode backend.
//!
//! Every operation writes a TCL script into the build directory and runs
//! `vivado -mode batch -source <script>`. Reports land next to the
//! bitstream and are read back by `analyze`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use benchloop_types::{FlashConfirmation, MetricKind, SimulationKind, SynthesisArtifact};
use chrono::Utc;
use tracing::{info, warn};

use crate::config::VivadoConfig;
use crate::error::{ToolchainError, ToolchainResult};
use crate::gateway::{
    report_file, AnalysisReport, GatewayState, GatewayStatus, ToolchainGateway,
    VerificationReport, POWER_REPORT, TIMING_REPORT, UTILIZATION_REPORT,
};
use crate::process::run_tool;

const TAIL_LINES: usize = 20;

/// Toolchain backed by a local Vivado installation.
pub struct VivadoToolchain {
    build_dir: PathBuf,
    config: VivadoConfig,
    timeout: Duration,
    state: GatewayState,
}

impl VivadoToolchain {
    pub fn new(build_dir: impl Into<PathBuf>, config: VivadoConfig, timeout: Duration) -> Self {
        Self {
            build_dir: build_dir.into(),
            config,
            timeout,
            state: GatewayState::new(),
        }
    }

    async fn run_script(
        &self,
        script_name: &str,
        script: &str,
        operation: &str,
    ) -> ToolchainResult<PathBuf> {
        std::fs::create_dir_all(&self.build_dir)?;
        let script_path = self.build_dir.join(script_name);
        std::fs::write(&script_path, script)?;
        let log_path = self.build_dir.join(format!("{}.log", operation));

        let args = vec![
            "-mode".to_string(),
            "batch".to_string(),
            "-nojournal".to_string(),
            "-log".to_string(),
            log_path.display().to_string(),
            "-source".to_string(),
            script_path.display().to_string(),
        ];
        let output = run_tool(
            &self.config.executable,
            &args,
            Path::new("."),
            self.timeout,
            operation,
        )
        .await?;

        if !output.success() {
            return Err(ToolchainError::CommandFailed {
                tool: self.config.executable.clone(),
                exit_code: output.exit_code,
                tail: output.tail(TAIL_LINES),
            });
        }
        Ok(log_path)
    }
}

#[async_trait]
impl ToolchainGateway for VivadoToolchain {
    async fn synthesize(
        &self,
        hdl_files: &[PathBuf],
        top_module: &str,
        part_number: &str,
    ) -> ToolchainResult<SynthesisArtifact> {
        if let Some(missing) = hdl_files.iter().find(|p| !p.exists()) {
            return Err(ToolchainError::SourceNotFound(missing.clone()));
        }
        let bitstream = self.build_dir.join(format!("{}.bit", top_module));
        let script = synthesis_script(
            hdl_files,
            top_module,
            part_number,
            &self.build_dir,
            &bitstream,
        );

        info!(top_module, part_number, "Running Vivado synthesis");
        let log = self.run_script("synthesize.tcl", &script, "synthesize").await?;
        let log_text = std::fs::read_to_string(&log).unwrap_or_default();

        let artifact = SynthesisArtifact {
            summary: format!("Synthesis successful. Bitstream generated at {}", bitstream.display()),
            bitstream,
            log,
            top_module: top_module.to_string(),
            part_number: part_number.to_string(),
            created_at: Utc::now(),
        };
        self.state.remember_synthesis(&artifact, hdl_files, log_text)?;
        Ok(artifact)
    }

    async fn flash(
        &self,
        bitstream: &Path,
        device_id: Option<&str>,
    ) -> ToolchainResult<FlashConfirmation> {
        let resolved = self.state.resolve_bitstream(bitstream)?;
        let script = program_script(&resolved, device_id, &self.config.hw_server_url);
        self.run_script("flash.tcl", &script, "flash").await?;

        let device = device_id.unwrap_or("default").to_string();
        Ok(FlashConfirmation {
            message: format!(
                "Device {} successfully flashed with {}.",
                device,
                resolved.display()
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
        let raw = std::fs::read_to_string(self.build_dir.join(report_file(metric)))?;
        let text = match metric {
            MetricKind::Utilization => {
                let summary = summarize_utilization(&raw);
                if summary.is_empty() {
                    warn!("No recognizable resource rows in utilization report");
                }
                format!("{}\n\n{}", summary, raw)
            }
            _ => raw,
        };
        Ok(AnalysisReport::Report { metric, text })
    }

    async fn verify(
        &self,
        testbench: &Path,
        kind: SimulationKind,
    ) -> ToolchainResult<VerificationReport> {
        if !testbench.exists() {
            return Err(ToolchainError::SourceNotFound(testbench.to_path_buf()));
        }
        let sources = self.state.last_sources()?;
        let script = simulation_script(&sources, testbench, kind);
        let report = match self.run_script("verify.tcl", &script, "verify").await {
            Ok(log) => {
                let text = std::fs::read_to_string(&log).unwrap_or_default();
                let passed = !text.contains("FAIL") && !text.contains("ERROR:");
                VerificationReport {
                    testbench: testbench.to_path_buf(),
                    kind,
                    passed,
                    summary: if passed {
                        "Testbench passed.".to_string()
                    } else {
                        "Testbench reported failures.".to_string()
                    },
                }
            }
            Err(ToolchainError::CommandFailed { tail, .. }) => VerificationReport {
                testbench: testbench.to_path_buf(),
                kind,
                passed: false,
                summary: tail,
            },
            Err(e) => return Err(e),
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
        "vivado"
    }
}

// ── TCL Generation ──────────────────────────────────────────────────

fn read_command(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("sv") => format!("read_verilog -sv {{{}}}", path.display()),
        Some("vhd") | Some("vhdl") => format!("read_vhdl {{{}}}", path.display()),
        _ => format!("read_verilog {{{}}}", path.display()),
    }
}

/// Full synth → place → route → reports → bitstream flow.
pub fn synthesis_script(
    hdl_files: &[PathBuf],
    top_module: &str,
    part_number: &str,
    build_dir: &Path,
    bitstream: &Path,
) -> String {
    let mut tcl = String::new();
    for file in hdl_files {
        let _ = writeln!(tcl, "{}", read_command(file));
    }
    let _ = writeln!(tcl, "synth_design -top {} -part {}", top_module, part_number);
    tcl.push_str("opt_design\nplace_design\nroute_design\n");
    let _ = writeln!(
        tcl,
        "report_utilization -file {{{}}}",
        build_dir.join(UTILIZATION_REPORT).display()
    );
    let _ = writeln!(
        tcl,
        "report_timing_summary -file {{{}}}",
        build_dir.join(TIMING_REPORT).display()
    );
    let _ = writeln!(
        tcl,
        "report_power -file {{{}}}",
        build_dir.join(POWER_REPORT).display()
    );
    let _ = writeln!(tcl, "write_bitstream -force {{{}}}", bitstream.display());
    tcl
}

/// Hardware-manager programming flow.
pub fn program_script(bitstream: &Path, device_id: Option<&str>, hw_server_url: &str) -> String {
    let device = match device_id {
        Some(id) => format!("[lindex [get_hw_devices {}] 0]", id),
        None => "[lindex [get_hw_devices] 0]".to_string(),
    };
    let mut tcl = String::new();
    tcl.push_str("open_hw_manager\n");
    let _ = writeln!(tcl, "connect_hw_server -url {}", hw_server_url);
    tcl.push_str("open_hw_target\n");
    let _ = writeln!(tcl, "current_hw_device {}", device);
    let _ = writeln!(
        tcl,
        "set_property PROGRAM.FILE {{{}}} [current_hw_device]",
        bitstream.display()
    );
    tcl.push_str("program_hw_devices [current_hw_device]\nclose_hw_manager\n");
    tcl
}

/// In-memory project simulation of a testbench against the last sources.
pub fn simulation_script(sources: &[PathBuf], testbench: &Path, kind: SimulationKind) -> String {
    let mut tcl = String::from("create_project -in_memory\n");
    for file in sources {
        let _ = writeln!(tcl, "add_files {{{}}}", file.display());
    }
    let _ = writeln!(tcl, "add_files -fileset sim_1 {{{}}}", testbench.display());
    let top = testbench
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("tb");
    let _ = writeln!(tcl, "set_property top {} [get_filesets sim_1]", top);
    let mode = match kind {
        SimulationKind::Behavioral => "behavioral",
        SimulationKind::PostSynthesis => "post-synthesis -type functional",
        SimulationKind::PostImplementation => "post-implementation -type functional",
    };
    let _ = writeln!(tcl, "launch_simulation -simset sim_1 -mode {}", mode);
    tcl.push_str("run all\nclose_sim\n");
    tcl
}

// ── Report Normalization ────────────────────────────────────────────

/// Condense a Vivado utilization table into `KEY: N%` lines.
///
/// Percentages are rounded up so a design using any of a resource never
/// reports 0%.
pub fn summarize_utilization(report: &str) -> String {
    const ROWS: [(&str, &str); 6] = [
        ("Slice LUTs", "LUT"),
        ("CLB LUTs", "LUT"),
        ("Slice Registers", "FF"),
        ("CLB Registers", "FF"),
        ("Block RAM Tile", "BRAM"),
        ("DSPs", "DSP"),
    ];

    let mut lines: Vec<String> = Vec::new();
    let mut seen: Vec<&str> = Vec::new();
    for row in report.lines() {
        let cells: Vec<&str> = row
            .split('|')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();
        let (Some(name), Some(util)) = (cells.first(), cells.last()) else {
            continue;
        };
        let Some((_, key)) = ROWS.iter().find(|(label, _)| name.starts_with(label)) else {
            continue;
        };
        if seen.contains(key) {
            continue;
        }
        if let Ok(pct) = util.parse::<f64>() {
            seen.push(key);
            lines.push(format!("{}: {}%", key, pct.ceil() as u32));
        }
    }
    lines.join("\n")
}
