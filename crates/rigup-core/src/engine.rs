//! Sequential convergence engine.
//!
//! Runs steps strictly in list order, one probe/apply cycle each, and
//! aggregates outcomes into a [`RunReport`]. A failing step never halts the
//! run: convergence is best-effort, not an atomic transaction.

use tracing::{info, warn};

use crate::step::{Step, StepOutcome, StepStatus};

/// Ordered outcomes of one engine invocation.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// One outcome per step, in step-list order.
    pub outcomes: Vec<StepOutcome>,
}

impl RunReport {
    /// Number of steps that applied a mutation.
    pub fn applied_count(&self) -> usize {
        self.count(StepStatus::Applied)
    }

    /// Number of steps that were already satisfied.
    pub fn skipped_count(&self) -> usize {
        self.count(StepStatus::Skipped)
    }

    /// Number of steps whose mutation failed.
    pub fn failed_count(&self) -> usize {
        self.count(StepStatus::Failed)
    }

    fn count(&self, status: StepStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// Progress sink for per-step status lines.
///
/// The engine reports each step as it starts and as it completes so partial
/// progress stays visible if the process is interrupted mid-run.
pub trait Reporter: Send {
    fn step_started(&mut self, name: &str);
    fn step_finished(&mut self, outcome: &StepOutcome);
    fn run_finished(&mut self, report: &RunReport);
}

/// ANSI palette for the console reporter.
mod color {
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const RED: &str = "\x1b[31m";
    pub const BLUE: &str = "\x1b[34m";
    pub const RESET: &str = "\x1b[0m";
}

/// [`Reporter`] that prints colored status lines to stdout.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for ConsoleReporter {
    fn step_started(&mut self, name: &str) {
        use std::io::Write;
        print!("{}[...]{} {}... ", color::BLUE, color::RESET, name);
        std::io::stdout().flush().ok();
    }

    fn step_finished(&mut self, outcome: &StepOutcome) {
        let tint = match outcome.status {
            StepStatus::Applied => color::GREEN,
            StepStatus::Skipped => color::YELLOW,
            StepStatus::Failed => color::RED,
        };
        println!("{}{}{}", tint, outcome.status.as_str(), color::RESET);
        if outcome.status == StepStatus::Failed {
            println!("      {}", outcome.message);
        }
    }

    fn run_finished(&mut self, report: &RunReport) {
        println!();
        println!("{}=== Summary =={}", color::BLUE, color::RESET);
        println!("  Applied: {}", report.applied_count());
        println!("  Skipped: {}", report.skipped_count());
        println!();
    }
}

/// The convergence engine: an ordered list of steps.
pub struct Engine {
    steps: Vec<Box<dyn Step>>,
}

impl Engine {
    pub fn new(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps }
    }

    /// Run every step once, in order.
    ///
    /// Per step: probe, and when unsatisfied, apply. An `Err` from `apply`
    /// becomes a failed outcome; execution continues with the next step.
    /// Nothing short of a signal terminates the run early.
    pub async fn run(&self, reporter: &mut dyn Reporter) -> RunReport {
        let mut report = RunReport::default();

        for step in &self.steps {
            let name = step.name();
            reporter.step_started(name);

            let outcome = if step.probe().await {
                info!(step = name, "already satisfied");
                StepOutcome::skipped(name)
            } else {
                match step.apply().await {
                    Ok(()) => {
                        info!(step = name, "applied");
                        StepOutcome::applied(name)
                    }
                    Err(e) => {
                        warn!(step = name, error = %e, "apply failed");
                        StepOutcome::failed(name, e)
                    }
                }
            };

            reporter.step_finished(&outcome);
            report.outcomes.push(outcome);
        }

        reporter.run_finished(&report);
        report
    }

    /// Probe every step without mutating anything.
    ///
    /// Returns `(name, satisfied)` pairs in step order.
    pub async fn check(&self) -> Vec<(String, bool)> {
        let mut results = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let satisfied = step.probe().await;
            results.push((step.name().to_string(), satisfied));
        }
        results
    }
}
