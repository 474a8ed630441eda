//! Bounded external tool execution.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::{ToolchainError, ToolchainResult};

/// Captured output of a finished tool process.
#[derive(Clone, Debug)]
pub(crate) struct ToolOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Last `n` lines of combined output.
    pub fn tail(&self, n: usize) -> String {
        let lines: Vec<&str> = self.stdout.lines().chain(self.stderr.lines()).collect();
        lines[lines.len().saturating_sub(n)..].join("\n")
    }
}

/// Run `program args..` in `cwd`, killing it if `timeout` elapses.
pub(crate) async fn run_tool(
    program: &str,
    args: &[String],
    cwd: &Path,
    timeout: Duration,
    operation: &str,
) -> ToolchainResult<ToolOutput> {
    debug!(program, ?args, cwd = %cwd.display(), "launching tool");

    let child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ToolchainError::ToolInvocation {
            tool: program.to_string(),
            source,
        })?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| ToolchainError::Timeout {
            operation: operation.to_string(),
            after: timeout,
        })??;

    Ok(ToolOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
