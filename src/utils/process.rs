//! Process execution utilities
//!
//! Provides async process execution with proper error handling and logging.

use crate::error::{BundlerError, Result};
use std::{ffi::OsStr, path::Path, process::Stdio};
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Utility for running external processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
    debug: bool,
}

/// Result of a process execution
#[derive(Debug)]
pub struct ProcessResult {
    /// Exit status code
    pub exit_code: Option<i32>,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl ProcessRunner {
    /// Create a new process runner
    #[must_use]
    pub const fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// Run a command and capture its output, failing on a non-zero exit
    #[instrument(skip(self, args), fields(program = %program.display()))]
    pub async fn run<S: AsRef<OsStr>>(&self, program: &Path, args: &[S]) -> Result<ProcessResult> {
        let cmd_str = format!(
            "{} {}",
            program.display(),
            args.iter()
                .map(|arg| arg.as_ref().to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        if self.debug {
            info!("+ {}", cmd_str);
        } else {
            debug!("+ {}", program.display());
        }

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                BundlerError::process(
                    cmd_str.clone(),
                    None,
                    format!("Failed to execute command: {e}"),
                )
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code();

        debug!(
            "Command finished: success={}, exit_code={:?}, stdout_len={}, stderr_len={}",
            output.status.success(),
            exit_code,
            stdout.len(),
            stderr.len()
        );

        if !output.status.success() {
            debug!("Command stderr: {}", stderr);
            return Err(BundlerError::process(cmd_str, exit_code, stderr));
        }

        Ok(ProcessResult {
            exit_code,
            stdout,
            stderr,
        })
    }

    /// Check if a command exists in PATH
    #[instrument(skip(self))]
    pub async fn command_exists(&self, command: &str) -> bool {
        let result = Command::new("which")
            .arg(command)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match result {
            Ok(status) => {
                let exists = status.success();
                debug!("Command '{}' exists: {}", command, exists);
                exists
            }
            Err(e) => {
                debug!("Failed to check if command '{}' exists: {}", command, e);
                false
            }
        }
    }
}
