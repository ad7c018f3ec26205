//! External command execution
//!
//! [`CommandRunner`] is the seam between rule logic and the ufw process:
//! it takes one complete command line and reports what the process printed
//! and whether it succeeded. [`ShellRunner`] is the real implementation;
//! tests substitute a recording mock.

use crate::core::error::{Error, Result};
use crate::elevation::create_elevated_shell_command;
use std::future::Future;
use std::process::Stdio;
use tracing::{error, info};

/// What one external command printed and how it exited
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            exit_code: Some(0),
        }
    }

    pub fn failed(stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
            exit_code: Some(exit_code),
        }
    }

    /// Converts an unsuccessful exit into [`Error::Ufw`]
    ///
    /// The message is the first non-empty line ufw printed, preferring stderr.
    pub fn into_result(self) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        let message = self
            .stderr
            .lines()
            .chain(self.stdout.lines())
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map_or_else(
                || format!("ufw exited with status {:?}", self.exit_code),
                str::to_string,
            );
        let stderr = (!self.stderr.trim().is_empty()).then(|| self.stderr.clone());
        Err(Error::Ufw {
            message,
            stderr,
            exit_code: self.exit_code,
        })
    }
}

/// Executes complete ufw command lines
pub trait CommandRunner {
    /// Runs one command line to completion.
    ///
    /// `Err` means the command could not be started; a command that ran and
    /// failed is `Ok` with `success == false`.
    fn run(&self, command: &str) -> impl Future<Output = Result<CommandOutput>> + Send;
}

/// Runs commands through `sh -c`, elevated when not root
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> Result<CommandOutput> {
        info!("Running: {command}");

        let output = create_elevated_shell_command(command)
            .map_err(|e| Error::Elevation(e.to_string()))?
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                error!("Failed to spawn shell for ufw: {e}");
                Error::Internal(format!("Failed to spawn shell for ufw: {e}"))
            })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
            exit_code: output.status.code(),
        })
    }
}
