//! Running candidate commands through the configured shell.
//!
//! The [`ShellRunner`] trait lets the validation node be driven by scripted
//! runners in tests without spawning anything.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::core::failure::ExecutionFailure;
use crate::io::process::run_command_with_timeout;

/// Result of running one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    Success { output: String },
    Failure(ExecutionFailure),
}

/// Abstraction over command execution.
pub trait ShellRunner {
    /// Run `command` in `working_dir`. Spawn errors are reported as failures.
    fn run(&self, command: &str, working_dir: &Path) -> ExecOutcome;
}

/// Runs commands as `<program...> <command>`, e.g. `bash -c "<command>"`.
#[derive(Debug, Clone)]
pub struct SystemShell {
    program: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl SystemShell {
    pub fn new(program: Vec<String>, timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            program,
            timeout,
            output_limit_bytes,
        }
    }
}

impl ShellRunner for SystemShell {
    #[instrument(skip_all, fields(command = %command, cwd = %working_dir.display()))]
    fn run(&self, command: &str, working_dir: &Path) -> ExecOutcome {
        let failure = |reason: String, exit_code, output: String, timed_out| {
            ExecOutcome::Failure(ExecutionFailure {
                command: command.to_string(),
                reason,
                exit_code,
                output,
                timed_out,
            })
        };

        let Some((program, args)) = self.program.split_first() else {
            let reason = "shell command is not configured".to_string();
            return failure(reason, None, String::new(), false);
        };
        let mut cmd = Command::new(program);
        cmd.args(args).arg(command).current_dir(working_dir);

        let output = match run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes) {
            Ok(output) => output,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "command did not run");
                return failure(format!("{err:#}"), None, String::new(), false);
            }
        };

        let text = output.combined();
        if output.timed_out {
            return failure(
                format!("timed out after {}s", self.timeout.as_secs()),
                output.status.code(),
                text,
                true,
            );
        }
        if !output.succeeded() {
            let reason = match output.status.code() {
                Some(code) => format!("exit status {code}"),
                None => "terminated by signal".to_string(),
            };
            info!(exit_code = ?output.status.code(), "command failed");
            return failure(reason, output.status.code(), text, false);
        }
        ExecOutcome::Success { output: text }
    }
}
