//! Optional and required steps.
//!
//! An [`OptionalStep`] logs its outcome and gives the caller nothing to act
//! on. A [`RequiredStep`] always yields a [`StepResult`] that ends up in the
//! report; spawn errors and timeouts are captured into it rather than
//! returned as `Err`.

use crate::config::StepConfig;
use crate::core::executor::{CommandOutput, ExecuteOptions, Executor};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Timeout used when a step's configured timeout does not parse.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// The kind of work a step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// Whole-tree formatter.
    Format,
    /// Documentation generation.
    Document,
    /// Test run.
    Test,
}

impl StepKind {
    /// Returns the step name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Format => "format",
            Self::Document => "document",
            Self::Test => "test",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a required step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// Exited zero.
    Passed,
    /// Exited non-zero or could not be started.
    Failed,
    /// Killed after exceeding its timeout.
    TimedOut(Duration),
    /// Not run because its condition was not met.
    Skipped(String),
}

/// Result of running a required step.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// What the step did.
    pub kind: StepKind,
    /// How it ended.
    pub status: StepStatus,
    /// Exit code, when the process exited on its own.
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr.
    pub output: String,
    /// Wall-clock time spent.
    pub duration: Duration,
}

impl StepResult {
    /// Creates a skipped result.
    #[must_use]
    pub fn skipped(kind: StepKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            status: StepStatus::Skipped(reason.into()),
            exit_code: None,
            output: String::new(),
            duration: Duration::ZERO,
        }
    }

    fn from_output(kind: StepKind, output: &CommandOutput, limit: Duration) -> Self {
        let (status, exit_code) = if output.timed_out {
            (StepStatus::TimedOut(limit), None)
        } else if output.success() {
            (StepStatus::Passed, Some(output.exit_code))
        } else {
            (StepStatus::Failed, Some(output.exit_code))
        };

        Self {
            kind,
            status,
            exit_code,
            output: output.combined_output(),
            duration: output.duration,
        }
    }

    /// Returns true unless the step failed or timed out.
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self.status, StepStatus::Passed | StepStatus::Skipped(_))
    }

    /// Returns true if the step was skipped.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self.status, StepStatus::Skipped(_))
    }

    /// Describes the outcome in a few words.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.status {
            StepStatus::Passed => format!("{} passed", self.kind),
            StepStatus::Failed => match self.exit_code {
                Some(code) => format!("{} failed (exit {code})", self.kind),
                None => format!("{} failed", self.kind),
            },
            StepStatus::TimedOut(limit) => format!(
                "{} timed out after {}",
                self.kind,
                humantime::format_duration(*limit)
            ),
            StepStatus::Skipped(reason) => format!("{} skipped ({reason})", self.kind),
        }
    }
}

/// A step whose failure is never reported to the caller.
#[derive(Debug, Clone, Copy)]
pub struct OptionalStep<'a> {
    kind: StepKind,
    config: &'a StepConfig,
}

impl<'a> OptionalStep<'a> {
    /// Wraps a step configuration.
    #[must_use]
    pub const fn new(kind: StepKind, config: &'a StepConfig) -> Self {
        Self { kind, config }
    }

    /// Runs the step in `cwd`, logging and discarding any failure.
    pub async fn run(&self, cwd: &Path) {
        if let Some(reason) = unmet_condition(self.config, cwd) {
            tracing::debug!(step = %self.kind, reason = %reason, "Skipping optional step");
            return;
        }

        let limit = timeout_of(self.config);
        match Executor::new()
            .execute(&self.config.run, &options(self.config, cwd, limit))
            .await
        {
            Ok(output) if output.success() => {
                tracing::debug!(step = %self.kind, "Optional step finished");
            },
            Ok(output) => {
                tracing::warn!(
                    step = %self.kind,
                    exit_code = output.exit_code,
                    timed_out = output.timed_out,
                    "Optional step failed, continuing"
                );
            },
            Err(e) => {
                tracing::warn!(step = %self.kind, error = %e, "Optional step could not run, continuing");
            },
        }
    }
}

/// A step whose outcome is recorded in the report.
#[derive(Debug, Clone, Copy)]
pub struct RequiredStep<'a> {
    kind: StepKind,
    config: &'a StepConfig,
}

impl<'a> RequiredStep<'a> {
    /// Wraps a step configuration.
    #[must_use]
    pub const fn new(kind: StepKind, config: &'a StepConfig) -> Self {
        Self { kind, config }
    }

    /// Runs the step in `cwd`. `label` names the package in progress output.
    pub async fn run(&self, cwd: &Path, label: &str) -> StepResult {
        if let Some(reason) = unmet_condition(self.config, cwd) {
            tracing::info!(step = %self.kind, package = label, reason = %reason, "Skipping step");
            return StepResult::skipped(self.kind, reason);
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .ok()
                .unwrap_or_else(ProgressStyle::default_spinner),
        );
        pb.set_message(format!("{label}: {}...", self.kind));
        pb.enable_steady_tick(Duration::from_millis(100));

        let limit = timeout_of(self.config);
        let result = match Executor::new()
            .execute(&self.config.run, &options(self.config, cwd, limit))
            .await
        {
            Ok(output) => StepResult::from_output(self.kind, &output, limit),
            Err(e) => StepResult {
                kind: self.kind,
                status: StepStatus::Failed,
                exit_code: None,
                output: e.to_string(),
                duration: Duration::ZERO,
            },
        };

        pb.finish_and_clear();
        tracing::info!(
            step = %self.kind,
            package = label,
            passed = result.passed(),
            duration = ?result.duration,
            "Step finished"
        );

        result
    }
}

fn timeout_of(config: &StepConfig) -> Duration {
    config.timeout_duration().unwrap_or_else(|| {
        tracing::warn!(
            timeout_str = %config.timeout,
            default_secs = DEFAULT_TIMEOUT.as_secs(),
            "Invalid timeout format, using default"
        );
        DEFAULT_TIMEOUT
    })
}

fn options(config: &StepConfig, cwd: &Path, limit: Duration) -> ExecuteOptions {
    config
        .env
        .iter()
        .fold(ExecuteOptions::default().cwd(cwd).timeout(limit), |opts, (k, v)| {
            opts.env(k.clone(), v.clone())
        })
}

/// Returns why the step should not run, if its condition is unmet.
fn unmet_condition(config: &StepConfig, cwd: &Path) -> Option<String> {
    let condition = config.enabled_if.as_ref()?;

    if let Some(ref file) = condition.file_exists {
        if !cwd.join(file).exists() {
            return Some(format!("{file} not found"));
        }
    }

    if let Some(ref cmd) = condition.command_exists {
        if !Executor::command_exists(cmd) {
            return Some(format!("{cmd} not installed"));
        }
    }

    None
}
