//! Shell command execution with captured output.
//!
//! All external commands go through the [`Shell`] trait so steps can be
//! exercised against a scripted fake. Three execution modes exist because
//! their contracts differ: parsing a token out of captured output versus
//! handing the terminal to a human prompt must not be conflated.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Result of a single command execution.
///
/// A non-zero exit is not an error at this layer: failure is represented in
/// the result, never raised. Spawn failures (missing interpreter, exhausted
/// resources) are folded into a failed output carrying the OS error text.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Raw captured stdout.
    pub stdout: String,

    /// Raw captured stderr.
    pub stderr: String,

    /// Whether the process exited with status zero.
    pub success: bool,
}

impl CommandOutput {
    /// Stdout with trailing/leading whitespace removed, for comparisons
    /// against expected values.
    pub fn trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// A successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
        }
    }

    /// A failed output with the given stderr.
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
        }
    }

    /// A failed output synthesized from a spawn error.
    pub(crate) fn spawn_failure(err: &std::io::Error) -> Self {
        Self {
            stdout: String::new(),
            stderr: err.to_string(),
            success: false,
        }
    }
}

/// Command execution seam.
///
/// Implemented by [`SystemShell`] for real runs and by
/// [`fakes::FakeShell`](crate::fakes::FakeShell) in tests.
#[async_trait]
pub trait Shell: Send + Sync {
    /// Run a command non-interactively, capturing both output streams.
    async fn run(&self, command: &str) -> CommandOutput;

    /// Run a command that may prompt the user, attaching the real terminal
    /// streams. Captured text is empty; only the exit status survives.
    async fn run_interactive(&self, command: &str) -> CommandOutput;

    /// Run a command that prompts via a side channel (e.g. /dev/tty) while
    /// its primary output is still captured for parsing.
    async fn run_interactive_capturing(&self, command: &str) -> CommandOutput;
}

/// [`Shell`] implementation backed by `sh -c`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShell;

impl SystemShell {
    pub fn new() -> Self {
        Self
    }

    fn command(command: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

#[async_trait]
impl Shell for SystemShell {
    async fn run(&self, command: &str) -> CommandOutput {
        debug!(command, "running");
        let output = match Self::command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => return CommandOutput::spawn_failure(&e),
        };

        CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        }
    }

    async fn run_interactive(&self, command: &str) -> CommandOutput {
        debug!(command, "running interactively");
        let status = match Self::command(command)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
        {
            Ok(status) => status,
            Err(e) => return CommandOutput::spawn_failure(&e),
        };

        CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            success: status.success(),
        }
    }

    async fn run_interactive_capturing(&self, command: &str) -> CommandOutput {
        debug!(command, "running interactively with captured stdout");
        // stdin and stderr stay attached to the terminal so the command can
        // prompt; stdout is piped for parsing.
        let output = match Self::command(command)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => return CommandOutput::spawn_failure(&e),
        };

        CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::new(),
            success: output.status.success(),
        }
    }
}
