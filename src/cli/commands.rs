//! CLI command implementations.

use crate::config::{Config, CONFIG_FILE_NAME};
use crate::core::changes::ChangeSet;
use crate::core::error::{Error, Result};
use crate::core::git::{list_changed_files, ChangeScope, GitRepo};
use crate::core::mode::{Mode, ModeMatcher};
use crate::core::orchestrator::{Orchestrator, PackageReport, Report, Verdict};
use crate::core::package::PackageLocator;
use crate::hook::{self, HookInput, BLOCKING_EXIT_CODE, SKIP_ENV_VAR};
use crate::presets;
use console::style;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;

/// Output lines shown per failing step by `check`.
const CHECK_OUTPUT_LINES: usize = 20;

/// Print the package root containing `path`.
pub fn root(dir: &Path, path: &Path, marker: Option<&str>) -> Result<ExitCode> {
    let marker = match marker {
        Some(m) => m.to_string(),
        None => Config::load_or_default(dir)?.package.marker,
    };

    match PackageLocator::new(marker, dir).find_root(path) {
        Ok(root) => {
            println!("{}", root.display());
            Ok(ExitCode::SUCCESS)
        },
        Err(e) => {
            tracing::debug!(error = %e, "No package root");
            Ok(ExitCode::FAILURE)
        },
    }
}

/// List changed package roots.
pub fn changed(dir: &Path, scope: ChangeScope) -> Result<ExitCode> {
    let Ok(repo) = GitRepo::discover_from(dir) else {
        tracing::debug!(dir = %dir.display(), "Not in a git repository, nothing changed");
        return Ok(ExitCode::SUCCESS);
    };

    let config = Config::load_or_default(repo.root())?;
    let files = list_changed_files(&repo, scope, &config.package.extensions);
    let locator = PackageLocator::new(config.package.marker, repo.root());
    let changes = ChangeSet::aggregate(&locator, files);

    let mut stdout = std::io::stdout().lock();
    for root in changes.roots() {
        writeln!(stdout, "{}", root.display()).map_err(|e| Error::io("write output", e))?;
    }

    Ok(ExitCode::SUCCESS)
}

/// Run as a tool-use hook.
pub async fn hook(dir: &Path) -> Result<ExitCode> {
    let mut raw = String::new();
    tokio::io::stdin()
        .read_to_string(&mut raw)
        .await
        .map_err(|e| Error::io("read hook input", e))?;

    let input = HookInput::parse(&raw)?;
    let outcome = hook::handle(&input, dir).await?;

    if let Some(json) = outcome.to_json()? {
        println!("{json}");
    }
    if let Some(reason) = outcome.block_reason() {
        eprintln!("{reason}");
    }

    Ok(ExitCode::from(outcome.exit_code))
}

/// Run checks for the changed packages.
pub async fn check(dir: &Path, mode: Mode) -> Result<ExitCode> {
    if std::env::var(SKIP_ENV_VAR).ok().as_deref() == Some("1") {
        eprintln!("{} Skipping checks ({SKIP_ENV_VAR}=1)", style("•").cyan());
        return Ok(ExitCode::SUCCESS);
    }

    let repo = match GitRepo::discover_from(dir) {
        Ok(repo) => repo,
        Err(Error::NotGitRepo) => {
            eprintln!("{} Not in a git repository, nothing to check", style("•").cyan());
            return Ok(ExitCode::SUCCESS);
        },
        Err(e) => return Err(e),
    };

    let config = Config::load_or_default(repo.root())?;
    let workdir = repo.root().to_path_buf();

    eprintln!(
        "{} Mode: {} ({} changes)",
        style("•").cyan(),
        style(mode.name()).bold(),
        mode.scope()
    );

    let report = Orchestrator::new(config, repo, workdir).run(mode).await;
    print_report(&report);

    match report.verdict() {
        Verdict::Block => Ok(ExitCode::from(BLOCKING_EXIT_CODE)),
        Verdict::Clean | Verdict::Passed | Verdict::Warn => Ok(ExitCode::SUCCESS),
    }
}

/// Prints a report for a terminal.
fn print_report(report: &Report) {
    eprintln!();
    if report.packages.is_empty() {
        eprintln!("{} No changed packages", style("✓").green().bold());
        return;
    }

    for package in &report.packages {
        print_package(package);
    }

    eprintln!();
    match report.verdict() {
        Verdict::Clean | Verdict::Passed => eprintln!(
            "{} All packages passed in {}",
            style("✓").green().bold(),
            humantime::format_duration(rounded(report.duration))
        ),
        Verdict::Warn => {
            eprintln!(
                "{} {} package(s) failed",
                style("!").yellow().bold(),
                report.failed_count()
            );
            eprintln!("  Commit allowed; fix these before opening a pull request.");
        },
        Verdict::Block => {
            eprintln!(
                "{} {} package(s) failed",
                style("✗").red().bold(),
                report.failed_count()
            );
            eprintln!("  Pull request blocked until these pass.");
        },
    }
}

/// Prints one package line and the output of its failing steps.
fn print_package(package: &PackageReport) {
    let mark = if package.passed() {
        style("✓").green()
    } else {
        style("✗").red()
    };
    let steps: Vec<_> = package.steps().map(|s| s.describe()).collect();
    eprintln!("{mark} {}: {}", style(&package.name).bold(), steps.join(", "));

    for step in package.steps().filter(|s| !s.passed()) {
        let lines: Vec<_> = step.output.lines().collect();
        let skip = lines.len().saturating_sub(CHECK_OUTPUT_LINES);
        for line in &lines[skip..] {
            eprintln!("    {}", style(line).dim());
        }
    }
}

/// Drops sub-millisecond precision for display.
fn rounded(duration: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_millis(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Show which mode a command selects.
pub fn mode(dir: &Path, command: &str) -> Result<ExitCode> {
    let config = Config::load_or_default(dir)?;

    match ModeMatcher::new(&config.hook)?.select(command) {
        Some(mode) => {
            println!("{mode}");
            eprintln!(
                "{} {} changes, failures {}",
                style("•").cyan(),
                mode.scope(),
                if mode.is_blocking() { "block" } else { "warn" }
            );
            Ok(ExitCode::SUCCESS)
        },
        None => {
            eprintln!(
                "{} Command is neither a commit nor a pull request",
                style("•").cyan()
            );
            Ok(ExitCode::FAILURE)
        },
    }
}

/// Initialize configuration.
pub fn init(dir: &Path, preset: Option<&str>, force: bool) -> Result<ExitCode> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        eprintln!(
            "{} Configuration already exists: {}",
            style("!").yellow(),
            config_path.display()
        );
        eprintln!("  Use --force to overwrite.");
        return Ok(ExitCode::FAILURE);
    }

    let preset = preset.unwrap_or(presets::names::R);
    let toml = Config::for_preset(preset).to_toml()?;
    std::fs::write(&config_path, toml).map_err(|e| Error::io("write config", e))?;

    eprintln!("{} Created {}", style("✓").green(), config_path.display());
    eprintln!("  Using preset: {preset} - {}", presets::description(preset));

    eprintln!("\nNext steps:");
    eprintln!("  1. Review and customize {CONFIG_FILE_NAME}");
    eprintln!("  2. Register `pkgpc hook` as a PreToolUse hook for shell commands");

    Ok(ExitCode::SUCCESS)
}

/// Validate configuration.
pub fn validate(dir: &Path) -> Result<ExitCode> {
    match Config::load(dir) {
        Ok(_) => {
            eprintln!("{} Configuration is valid", style("✓").green());
            Ok(ExitCode::SUCCESS)
        },
        Err(Error::ConfigNotFound { path }) => {
            eprintln!(
                "{} Configuration not found: {}",
                style("!").yellow(),
                path.display()
            );
            eprintln!("  Run: pkgpc init");
            Ok(ExitCode::FAILURE)
        },
        Err(e) => {
            eprintln!("{} Configuration validation failed: {e}", style("✗").red());
            Ok(ExitCode::FAILURE)
        },
    }
}

/// Show configuration.
pub fn config(dir: &Path, raw: bool) -> Result<ExitCode> {
    match Config::find_config_file(dir) {
        Ok(path) => {
            eprintln!("Configuration file: {}", path.display());

            if raw {
                let content =
                    std::fs::read_to_string(&path).map_err(|e| Error::io("read config", e))?;
                eprintln!();
                std::io::stdout()
                    .write_all(content.as_bytes())
                    .map_err(|e| Error::io("write output", e))?;
            }

            Ok(ExitCode::SUCCESS)
        },
        Err(Error::ConfigNotFound { .. }) => {
            eprintln!(
                "{} No configuration file found, using {} defaults",
                style("!").yellow(),
                presets::names::R
            );
            if raw {
                let toml = Config::default().to_toml()?;
                std::io::stdout()
                    .write_all(toml.as_bytes())
                    .map_err(|e| Error::io("write output", e))?;
            }
            Ok(ExitCode::SUCCESS)
        },
        Err(e) => Err(e),
    }
}

/// Generate shell completions.
pub fn completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    clap_complete::generate(
        shell,
        &mut super::Cli::command(),
        "pkgpc",
        &mut std::io::stdout(),
    );
}
