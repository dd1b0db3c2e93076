//! Scripted fakes for the shell and reporter seams (testing only).
//!
//! `FakeShell` replays configured outputs keyed by exact command string and
//! records every command it is asked to run, across all three execution
//! modes. Unconfigured commands succeed with empty output.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::engine::{Reporter, RunReport};
use crate::shell::{CommandOutput, Shell};
use crate::step::StepOutcome;

/// In-memory [`Shell`] with scripted responses.
#[derive(Debug, Default)]
pub struct FakeShell {
    commands: Mutex<Vec<String>>,
    responses: Mutex<HashMap<String, CommandOutput>>,
}

impl FakeShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the output for an exact command string.
    pub fn respond(&self, command: &str, output: CommandOutput) {
        self.responses
            .lock()
            .unwrap()
            .insert(command.to_string(), output);
    }

    /// Script a successful response with the given stdout.
    pub fn respond_ok(&self, command: &str, stdout: &str) {
        self.respond(command, CommandOutput::ok(stdout));
    }

    /// Script a failed response with the given stderr.
    pub fn respond_err(&self, command: &str, stderr: &str) {
        self.respond(command, CommandOutput::failed(stderr));
    }

    /// Every command run so far, in execution order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// Whether any recorded command contains the given fragment.
    pub fn ran(&self, fragment: &str) -> bool {
        self.count_ran(fragment) > 0
    }

    /// Number of recorded commands containing the given fragment.
    pub fn count_ran(&self, fragment: &str) -> usize {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.contains(fragment))
            .count()
    }

    fn record_and_reply(&self, command: &str) -> CommandOutput {
        self.commands.lock().unwrap().push(command.to_string());
        self.responses
            .lock()
            .unwrap()
            .get(command)
            .cloned()
            .unwrap_or_else(|| CommandOutput::ok(""))
    }
}

#[async_trait]
impl Shell for FakeShell {
    async fn run(&self, command: &str) -> CommandOutput {
        self.record_and_reply(command)
    }

    async fn run_interactive(&self, command: &str) -> CommandOutput {
        self.record_and_reply(command)
    }

    async fn run_interactive_capturing(&self, command: &str) -> CommandOutput {
        self.record_and_reply(command)
    }
}

/// Recording [`Reporter`] for engine tests.
#[derive(Debug, Default)]
pub struct FakeReporter {
    pub started: Vec<String>,
    pub finished: Vec<StepOutcome>,
    pub summary_seen: bool,
}

impl FakeReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for FakeReporter {
    fn step_started(&mut self, name: &str) {
        self.started.push(name.to_string());
    }

    fn step_finished(&mut self, outcome: &StepOutcome) {
        self.finished.push(outcome.clone());
    }

    fn run_finished(&mut self, _report: &RunReport) {
        self.summary_seen = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unscripted_commands_succeed_with_empty_output() {
        let shell = FakeShell::new();
        let result = shell.run("anything").await;
        assert!(result.success);
        assert!(result.stdout.is_empty());
    }

    #[tokio::test]
    async fn scripted_response_is_replayed() {
        let shell = FakeShell::new();
        shell.respond_ok("which bw", "/opt/homebrew/bin/bw");

        let result = shell.run("which bw").await;

        assert!(result.success);
        assert_eq!(result.trimmed(), "/opt/homebrew/bin/bw");
    }

    #[tokio::test]
    async fn records_commands_across_all_modes() {
        let shell = FakeShell::new();
        shell.run("one").await;
        shell.run_interactive("two").await;
        shell.run_interactive_capturing("three").await;

        assert_eq!(shell.commands(), vec!["one", "two", "three"]);
        assert!(shell.ran("two"));
        assert_eq!(shell.count_ran("o"), 2);
    }
}
