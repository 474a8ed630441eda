//! Output formatting utilities

use benchloop_types::{BenchmarkRun, StageOutcome, StageStatus};
use colored::*;
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::error::CliResult;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text and tables
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Print a single item in a machine-readable format
pub fn print_single<T: Serialize>(data: &T, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Table | OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(data)?);
        }
    }
    Ok(())
}

#[derive(Tabled)]
struct StageRow {
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl From<&StageOutcome> for StageRow {
    fn from(o: &StageOutcome) -> Self {
        let status = match o.status {
            StageStatus::Succeeded => "ok".green().to_string(),
            StageStatus::Warned => "warn".yellow().to_string(),
            StageStatus::Failed => "failed".red().to_string(),
        };
        let detail = o.detail.lines().next().unwrap_or_default().to_string();
        Self {
            stage: o.stage.to_string(),
            status,
            detail,
        }
    }
}

/// Table of per-stage outcomes
pub fn print_stages(stages: &[StageOutcome]) {
    if stages.is_empty() {
        println!("{}", "No stages recorded".dimmed());
        return;
    }
    let rows: Vec<StageRow> = stages.iter().map(StageRow::from).collect();
    println!("{}", Table::new(rows));
}

/// Stage table followed by the score block
pub fn print_run(run: &BenchmarkRun, format: OutputFormat) -> CliResult<()> {
    if !matches!(format, OutputFormat::Table) {
        return print_single(run, format);
    }
    let score = run.score();
    print_stages(run.stages());
    println!();
    println!("==========================================");
    println!("DESIGN SCORE: {}", format!("{:.2}", score.value).bold());
    println!("==========================================");
    println!("Metrics:");
    println!("  - Time: {:.4}s", score.elapsed_seconds);
    println!(
        "  - Space ({}): {}%",
        score.resource_key, score.utilization_percent
    );
    if score.defaulted {
        print_warning(&format!(
            "{} not found in utilization report, scored as {}%",
            score.resource_key, score.utilization_percent
        ));
    }
    println!("==========================================");
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchloop_types::Stage;

    #[test]
    fn test_output_format_default() {
        assert!(matches!(OutputFormat::default(), OutputFormat::Table));
    }

    #[test]
    fn test_stage_row_keeps_first_detail_line() {
        colored::control::set_override(false);
        let outcome = StageOutcome {
            stage: Stage::Build,
            status: StageStatus::Warned,
            detail: "Build(exit=1, 2.0s)\n[error] more".into(),
            recorded_at: chrono::Utc::now(),
        };
        let row = StageRow::from(&outcome);
        assert_eq!(row.stage, "build");
        assert_eq!(row.status, "warn");
        assert_eq!(row.detail, "Build(exit=1, 2.0s)");
    }
}
