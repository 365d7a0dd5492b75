//! External command descriptors and the runner abstraction.
//!
//! Every stage describes the process it wants as a [`CommandSpec`] and hands
//! it to a [`CommandRunner`]. [`SystemRunner`] spawns real processes,
//! [`DryRunRunner`] only reports them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::DeployError;
use crate::style;

/// Whether a failing command halts the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Logged and skipped
    Advisory,
    /// Halts the run with exit code 1
    Fatal,
}

/// How the child's output is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Child shares our stdin/stdout/stderr
    Inherit,
    /// Stdout is collected into [`CommandOutcome::stdout`]
    Capture,
}

/// A single external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: PathBuf,
    /// Shown when the command fails
    pub label: String,
    pub severity: Severity,
    pub output: OutputMode,
}

impl CommandSpec {
    /// Advisory command with inherited stdio
    pub fn new(program: &str, current_dir: &Path, label: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            current_dir: current_dir.to_path_buf(),
            label: label.to_string(),
            severity: Severity::Advisory,
            output: OutputMode::Inherit,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn fatal(mut self) -> Self {
        self.severity = Severity::Fatal;
        self
    }

    pub fn captured(mut self) -> Self {
        self.output = OutputMode::Capture;
        self
    }

    /// Program plus arguments, space separated
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Exit status and (when captured) stdout of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    /// `None` when the child was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
}

impl CommandOutcome {
    pub fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
        }
    }

    pub fn with_stdout(mut self, stdout: &str) -> Self {
        self.stdout = stdout.to_string();
        self
    }

    #[inline]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs command descriptors to completion
pub trait CommandRunner {
    /// Run `spec` and wait for it. `Err` only when the process could not be
    /// started; a non-zero exit is reported through the outcome.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome, DeployError>;

    /// Whether `program` resolves on the search path
    fn is_available(&self, program: &str) -> bool;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome, DeployError> {
        (**self).run(spec)
    }

    fn is_available(&self, program: &str) -> bool {
        (**self).is_available(program)
    }
}

/// Spawns real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome, DeployError> {
        debug!(command = %spec, dir = %spec.current_dir.display(), "Spawning");

        let mut command = Command::new(resolve_program(&spec.program));
        command.args(&spec.args).current_dir(&spec.current_dir);

        let spawn_failed = |source| DeployError::SpawnFailed {
            command: spec.command_line(),
            source,
        };

        match spec.output {
            OutputMode::Inherit => {
                let status = command.status().map_err(spawn_failed)?;
                Ok(CommandOutcome {
                    code: status.code(),
                    stdout: String::new(),
                })
            }
            OutputMode::Capture => {
                let output = command
                    .stdin(Stdio::null())
                    .stderr(Stdio::piped())
                    .output()
                    .map_err(spawn_failed)?;
                if !output.stderr.is_empty() {
                    debug!(
                        command = %spec,
                        stderr = %String::from_utf8_lossy(&output.stderr).trim_end(),
                        "Captured stderr"
                    );
                }
                Ok(CommandOutcome {
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                })
            }
        }
    }

    fn is_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Full path of `program` on the search path, so `npm` finds `npm.cmd` on
/// Windows. An unresolved name is returned as-is and fails at spawn.
pub fn resolve_program(program: &str) -> PathBuf {
    which::which(program).unwrap_or_else(|_| PathBuf::from(program))
}

/// Reports commands without running them; every command "succeeds"
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome, DeployError> {
        style::info(&format!("[dry-run] {spec}"));
        Ok(CommandOutcome::exited(0))
    }

    fn is_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Run `spec`, reporting progress and failures on the console.
///
/// Returns whether the command exited successfully. Spawn failures and
/// non-zero exits both yield `false`; halting on a fatal command is up to
/// the caller.
pub fn execute(runner: &dyn CommandRunner, spec: &CommandSpec) -> bool {
    style::info(&format!("Executing: {spec}"));

    match failure_message(spec, runner.run(spec)) {
        None => true,
        Some(message) => {
            debug!(command = %spec, severity = ?spec.severity, "{message}");
            style::error(&message);
            false
        }
    }
}

/// One console line for a failed run, `None` on success
fn failure_message(
    spec: &CommandSpec,
    result: Result<CommandOutcome, DeployError>,
) -> Option<String> {
    match result {
        Ok(outcome) if outcome.success() => None,
        Ok(outcome) => Some(
            DeployError::CommandFailed {
                label: spec.label.clone(),
                command: spec.command_line(),
                code: outcome.code,
            }
            .to_string(),
        ),
        Err(e) => Some(format!("{}: {}", spec.label, e.chain())),
    }
}
