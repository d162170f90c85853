//! Per-package documentation and test orchestration.
//!
//! Formats the tree, maps changed files to packages, then documents and
//! tests each package in turn. A failing package never stops the loop; the
//! verdict is only taken once every package has been checked.

use crate::config::Config;
use crate::core::changes::{ChangeSet, PackageChanges};
use crate::core::git::{list_changed_files, ChangeSource};
use crate::core::mode::Mode;
use crate::core::package::PackageLocator;
use crate::core::step::{OptionalStep, RequiredStep, StepKind, StepResult};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Outcome of checking one package.
#[derive(Debug, Clone)]
pub struct PackageReport {
    /// Package name.
    pub name: String,
    /// Package root directory.
    pub root: PathBuf,
    /// Documentation step, if the documentation sources changed.
    pub document: Option<StepResult>,
    /// Test step.
    pub test: StepResult,
}

impl PackageReport {
    /// Returns true if every step that ran passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.steps().all(StepResult::passed)
    }

    /// Iterates the steps that were attempted, in run order.
    pub fn steps(&self) -> impl Iterator<Item = &StepResult> {
        self.document.iter().chain(std::iter::once(&self.test))
    }
}

/// Final decision for an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No affected packages; nothing to say.
    Clean,
    /// Every package passed.
    Passed,
    /// Failures reported, action allowed.
    Warn,
    /// Failures reported, action rejected.
    Block,
}

/// Result of one orchestrator run.
#[derive(Debug)]
pub struct Report {
    /// Mode that was used.
    pub mode: Mode,
    /// Per-package results, in change-set order.
    pub packages: Vec<PackageReport>,
    /// Total duration.
    pub duration: Duration,
}

impl Report {
    /// Creates an empty report for `mode`.
    #[must_use]
    pub fn empty(mode: Mode) -> Self {
        Self {
            mode,
            packages: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Returns true if all packages passed.
    #[must_use]
    pub fn success(&self) -> bool {
        self.packages.iter().all(PackageReport::passed)
    }

    /// Returns the number of failed packages.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.packages.iter().filter(|p| !p.passed()).count()
    }

    /// Returns failed package reports.
    pub fn failed_packages(&self) -> impl Iterator<Item = &PackageReport> {
        self.packages.iter().filter(|p| !p.passed())
    }

    /// Decides the outcome. Severity depends only on the mode.
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        if self.packages.is_empty() {
            Verdict::Clean
        } else if self.success() {
            Verdict::Passed
        } else if self.mode.is_blocking() {
            Verdict::Block
        } else {
            Verdict::Warn
        }
    }

    /// Renders the consolidated message, or `None` when there is nothing to say.
    ///
    /// Every package gets a line; failing steps also get the last
    /// `max_output_lines` lines of their output.
    #[must_use]
    pub fn summary(&self, max_output_lines: usize) -> Option<String> {
        let verdict = self.verdict();
        let mut lines = match verdict {
            Verdict::Clean => return None,
            Verdict::Passed => {
                let names: Vec<_> = self.packages.iter().map(|p| p.name.as_str()).collect();
                return Some(format!(
                    "pkg-precommit ({}): checks passed for {}",
                    self.mode,
                    names.join(", ")
                ));
            },
            Verdict::Warn | Verdict::Block => vec![format!(
                "pkg-precommit ({}): {} of {} package(s) failed",
                self.mode,
                self.failed_count(),
                self.packages.len()
            )],
        };

        for package in &self.packages {
            let mark = if package.passed() { '✓' } else { '✗' };
            let steps: Vec<_> = package.steps().map(StepResult::describe).collect();
            lines.push(format!("{mark} {}: {}", package.name, steps.join(", ")));

            for step in package.steps().filter(|s| !s.passed()) {
                lines.extend(tail(&step.output, max_output_lines).map(|line| format!("    {line}")));
            }
        }

        lines.push(if verdict == Verdict::Warn {
            "Commit allowed; fix these before opening a pull request.".to_string()
        } else {
            "Pull request blocked until these pass.".to_string()
        });

        Some(lines.join("\n"))
    }
}

/// Returns the last `n` lines of `text`.
fn tail(text: &str, n: usize) -> impl Iterator<Item = &str> {
    let lines: Vec<_> = text.lines().collect();
    let skip = lines.len().saturating_sub(n);
    lines.into_iter().skip(skip)
}

/// Drives the format, discover and per-package steps.
#[derive(Debug)]
pub struct Orchestrator<S> {
    config: Config,
    source: S,
    workdir: PathBuf,
}

impl<S: ChangeSource> Orchestrator<S> {
    /// Creates an orchestrator over `source`, rooted at `workdir`.
    ///
    /// `workdir` is where the formatter runs and what relative paths are
    /// resolved against; normally the repository root.
    pub fn new(config: Config, source: S, workdir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            source,
            workdir: workdir.into(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lists the changed packages for `mode` without running anything.
    pub fn discover(&self, mode: Mode) -> ChangeSet {
        let files = list_changed_files(&self.source, mode.scope(), &self.config.package.extensions);
        tracing::debug!(count = files.len(), scope = %mode.scope(), "Changed files");

        let locator = PackageLocator::new(self.config.package.marker.clone(), &self.workdir);
        ChangeSet::aggregate(&locator, files)
    }

    /// Runs every step for `mode` and collects the results.
    pub async fn run(&self, mode: Mode) -> Report {
        let start = Instant::now();

        if let Some(ref format) = self.config.format {
            OptionalStep::new(StepKind::Format, format)
                .run(&self.workdir)
                .await;
        }

        let changes = self.discover(mode);
        if changes.is_empty() {
            tracing::info!(mode = %mode, "No changed packages");
            return Report::empty(mode);
        }

        let mut packages = Vec::with_capacity(changes.len());
        for change in changes.packages() {
            packages.push(self.check_package(change).await);
        }

        Report {
            mode,
            packages,
            duration: start.elapsed(),
        }
    }

    async fn check_package(&self, change: &PackageChanges) -> PackageReport {
        let package = &change.package;

        let document = match (&self.config.document, &self.config.package.doc_dir) {
            (Some(step), Some(doc_dir)) if change.touches(Path::new(doc_dir)) => Some(
                RequiredStep::new(StepKind::Document, step)
                    .run(&package.path, &package.name)
                    .await,
            ),
            _ => None,
        };

        let test = RequiredStep::new(StepKind::Test, &self.config.test)
            .run(&package.path, &package.name)
            .await;

        PackageReport {
            name: package.name.clone(),
            root: package.path.clone(),
            document,
            test,
        }
    }
}
