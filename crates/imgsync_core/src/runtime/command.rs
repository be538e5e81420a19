//! Shell command execution.
//!
//! # Responsibility
//! - Run one shell-interpreted command and capture stdout and stderr as text.
//!
//! # Invariants
//! - `CommandRunner::run` never panics and never returns an error value;
//!   callers treat non-empty `error` text as the failure signal.
//! - Captured text is trimmed of surrounding whitespace.

use log::{debug, error};
use std::process::{Command, Output};
use std::time::Instant;

/// Captured result of one runtime command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    /// Stderr text, or the spawn/exit failure description.
    pub error: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            error: String::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            error: error.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        !self.error.is_empty()
    }
}

/// Executes runtime command lines.
pub trait CommandRunner {
    fn run(&self, command: &str) -> CommandOutput;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, command: &str) -> CommandOutput {
        (**self).run(command)
    }
}

/// Runs commands through the host shell (`sh -c` or `cmd /C`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> CommandOutput {
        let started_at = Instant::now();
        debug!("event=command_run module=runtime status=start command={command}");

        match shell_command(command).output() {
            Ok(output) => {
                let captured = capture(&output);
                debug!(
                    "event=command_run module=runtime status={} duration_ms={} exit_code={}",
                    if captured.is_failure() { "error" } else { "ok" },
                    started_at.elapsed().as_millis(),
                    output
                        .status
                        .code()
                        .map_or_else(|| "signal".to_string(), |code| code.to_string())
                );
                captured
            }
            Err(err) => {
                error!(
                    "event=command_run module=runtime status=error error_code=spawn_failed command={} error={}",
                    command, err
                );
                CommandOutput::failure(err.to_string())
            }
        }
    }
}

fn capture(output: &Output) -> CommandOutput {
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let mut error = String::from_utf8_lossy(&output.stderr).trim().to_string();

    // A non-zero exit with silent stderr still counts as a failure.
    if error.is_empty() && !output.status.success() {
        error = format!("command exited with {}", output.status);
    }

    CommandOutput { stdout, error }
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    use std::os::windows::process::CommandExt;

    // `cmd` parses its own command line; `arg` escaping would leak `\"` into it.
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").raw_arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}
