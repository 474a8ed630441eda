//! Runs the design's build command and captures the result.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use benchloop_types::BuildResult;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::error::{BuildError, BuildInvokeResult};

/// Program and arguments of a build.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl BuildCommand {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for BuildCommand {
    /// `sbt "runMain cpu.TopMain"`
    fn default() -> Self {
        Self::new("sbt", ["runMain cpu.TopMain"])
    }
}

impl std::fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Regenerates HDL from the patched design sources.
#[async_trait]
pub trait BuildInvoker: Send + Sync {
    /// Run `command` in `working_dir`. A non-zero exit is returned in the
    /// result; only launch failures and timeouts are errors.
    async fn build(
        &self,
        working_dir: &Path,
        command: &BuildCommand,
        timeout: Duration,
    ) -> BuildInvokeResult<BuildResult>;
}

/// Runs the build as a child process.
#[derive(Clone, Debug, Default)]
pub struct CommandBuildInvoker;

impl CommandBuildInvoker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BuildInvoker for CommandBuildInvoker {
    #[instrument(skip(self), fields(command = %command))]
    async fn build(
        &self,
        working_dir: &Path,
        command: &BuildCommand,
        timeout: Duration,
    ) -> BuildInvokeResult<BuildResult> {
        debug!(cwd = %working_dir.display(), "Starting build");
        let started = tokio::time::Instant::now();

        let child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BuildError::ToolInvocation {
                program: command.program.clone(),
                source,
            })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(BuildError::ToolInvocation {
                    program: command.program.clone(),
                    source,
                })
            }
            Err(_) => {
                warn!(?timeout, "Build timed out, child killed");
                return Err(BuildError::Timeout(timeout));
            }
        };

        let result = BuildResult {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: started.elapsed(),
        };
        info!(
            exit_code = ?result.exit_code,
            elapsed_ms = result.duration.as_millis() as u64,
            "Build finished"
        );
        Ok(result)
    }
}
