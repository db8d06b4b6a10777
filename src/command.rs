//! External command execution.
//!
//! Commands are passed to the OS as an argv vector, never through a shell,
//! so interface names containing spaces or quotes reach the tool intact.

use crate::error::{ChangerError, Result};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::process::Stdio;
use tokio::task::JoinSet;

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemCommand {
    /// Executable name, resolved through `PATH`.
    pub program: String,
    /// Arguments, one per argv slot.
    pub args: Vec<String>,
}

impl SystemCommand {
    /// Creates a command with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Renders the literal command line, quoting arguments that need it.
impl fmt::Display for SystemCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '"') {
                write!(f, " \"{}\"", arg.replace('"', "\\\""))?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// What a finished command left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` if the process could not be started or was killed
    /// by a signal.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// A zero-exit result with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A non-zero result with the given stderr.
    #[must_use]
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// A process that never ran.
    #[must_use]
    pub fn not_started(error: &std::io::Error) -> Self {
        Self {
            code: None,
            stdout: String::new(),
            stderr: error.to_string(),
        }
    }

    /// `true` on exit code 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Converts a non-zero exit into [`ChangerError::Command`].
    ///
    /// # Errors
    ///
    /// Returns [`ChangerError::Command`] unless the command exited 0.
    pub fn into_result(self, command: &SystemCommand) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(ChangerError::Command {
                command: command.to_string(),
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }

    /// A short description of why the command failed.
    #[must_use]
    pub fn failure_reason(&self) -> String {
        let detail = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        match (self.code, detail.is_empty()) {
            (Some(code), true) => format!("exit code {code}"),
            (Some(code), false) => format!("exit code {code}: {detail}"),
            (None, true) => "did not run".to_string(),
            (None, false) => format!("did not run: {detail}"),
        }
    }
}

/// Executes external commands.
///
/// Implementations never fail: launch errors are reported through
/// [`CommandOutput::code`] being `None`, so callers branch on the output
/// rather than on a `Result`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `command` to completion and captures its output.
    async fn run(&self, command: &SystemCommand) -> CommandOutput;
}

/// Runs commands on the host with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, command: &SystemCommand) -> CommandOutput {
        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        match cmd.output().await {
            Ok(output) => CommandOutput {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Err(e) => {
                tracing::debug!(command = %command, error = %e, "Failed to start command");
                CommandOutput::not_started(&e)
            }
        }
    }
}

/// Supervised best-effort steps (cache flushes, daemon restarts).
///
/// Steps run concurrently with the rest of the operation. A failing or
/// panicking step is logged and otherwise ignored; [`drain`](Self::drain)
/// waits for all of them so none is cut off when the runtime shuts down.
#[derive(Default)]
pub struct BestEffort {
    tasks: JoinSet<()>,
}

impl BestEffort {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `step` in the background under `label`.
    pub fn spawn<F>(&mut self, label: &'static str, step: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.tasks.spawn(async move {
            if let Err(e) = step.await {
                tracing::warn!(step = label, error = %e, "Best-effort step failed, ignoring");
            }
        });
    }

    /// Number of steps still outstanding.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// `true` if nothing was spawned or everything finished.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits for every step.
    pub async fn drain(mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "Best-effort step panicked, ignoring");
            }
        }
    }
}
