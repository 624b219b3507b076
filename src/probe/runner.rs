//! Run-and-capture primitive for external tools

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use crate::observability::{log_event, Event};

use super::errors::{ProbeError, ProbeResult};

/// Captured result of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Exit status, or -1 when the process was killed by a signal
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<Vec<u8>>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: Vec::new(),
            exit_code,
        }
    }

    pub fn with_stderr(mut self, stderr: impl Into<Vec<u8>>) -> Self {
        self.stderr = stderr.into();
        self
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout as UTF-8, `None` if it does not decode.
    pub fn stdout_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.stdout).ok()
    }

    /// Stderr for diagnostics, lossily decoded.
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim_end().to_string()
    }
}

/// Synchronous external command execution.
///
/// Implementations block until the command exits. There are no retries.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &Path, args: &[&str]) -> ProbeResult<CommandOutput>;
}

/// Runs commands as child processes of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &Path, args: &[&str]) -> ProbeResult<CommandOutput> {
        let program_str = program.display().to_string();
        // Arguments can carry a password, so only their count is logged
        log_event(
            Event::CommandLaunched,
            &[("program", &program_str), ("argc", &args.len().to_string())],
        );

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| {
                log_event(
                    Event::CommandLaunchFailed,
                    &[("program", &program_str), ("reason", &source.to_string())],
                );
                ProbeError::Launch {
                    program: program.to_path_buf(),
                    source,
                }
            })?;

        Ok(CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

/// Decode stdout, logging when it is not UTF-8.
pub(crate) fn decoded_stdout<'o>(program: &Path, output: &'o CommandOutput) -> Option<&'o str> {
    let text = output.stdout_text();
    if text.is_none() {
        log_event(
            Event::CommandOutputUndecodable,
            &[("program", &program.display().to_string())],
        );
    }
    text
}

/// Log a non-zero exit status for `program`.
pub(crate) fn log_exit_status(program: &Path, output: &CommandOutput) {
    log_event(
        Event::CommandExitNonZero,
        &[
            ("program", &program.display().to_string()),
            ("exit_code", &output.exit_code.to_string()),
            ("stderr", &output.stderr_lossy()),
        ],
    );
}

/// Locations of the external tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    /// Credential-escrow and bootstrap status utility
    pub profiles: PathBuf,
    /// Device-management client
    pub mdmclient: PathBuf,
    /// Directory service command line utility
    pub dscl: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            profiles: PathBuf::from("/usr/bin/profiles"),
            mdmclient: PathBuf::from("/usr/libexec/mdmclient"),
            dscl: PathBuf::from("/usr/bin/dscl"),
        }
    }
}
