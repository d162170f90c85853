//! Command-line interface for pkg-precommit.
//!
//! This module provides the `pkgpc` CLI with subcommands for:
//! - `root`: Resolve the package root of a path
//! - `changed`: List changed package roots
//! - `hook`: Run as a tool-use hook (JSON on stdin)
//! - `check`: Run the package checks by hand
//! - `mode`: Show which mode a command selects
//! - `init`, `validate`, `config`: Manage configuration

mod commands;

use crate::core::error::{Error, Result};
use crate::core::git::ChangeScope;
use crate::core::mode::Mode;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Changed-package resolution and pre-commit checks.
#[derive(Debug, Parser)]
#[command(
    name = "pkgpc",
    author,
    version,
    about = "Changed-package resolution and pre-commit checks for multi-package repositories",
    long_about = r#"
pkg-precommit (pkgpc) maps changed files to the packages that own them,
regenerates documentation and runs tests for each affected package.

A commit gets a warning when checks fail. Opening a pull request is blocked.

Quick start:
  pkgpc init                 # Create pkg-precommit.toml
  pkgpc changed --staged     # Which packages does this commit touch?
  pkgpc check --mode pr      # Run the checks by hand
  pkgpc hook < payload.json  # Run as a tool-use hook

Environment variables:
  PKG_PRECOMMIT_SKIP=1       Skip all checks in hook mode
  RUST_LOG=debug             Override log filtering
"#,
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Directory to work from (defaults to the current directory).
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use color output.
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,
}

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Always use color.
    Always,
    /// Auto-detect color support.
    #[default]
    Auto,
    /// Never use color.
    Never,
}

/// Mode accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ModeArg {
    /// Staged files, failures warn.
    Commit,
    /// All uncommitted files, failures block.
    Pr,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Commit => Self::Commit,
            ModeArg::Pr => Self::Pr,
        }
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the package root containing PATH.
    Root {
        /// File or directory to resolve.
        path: PathBuf,

        /// Marker file name (defaults to the configured marker).
        #[arg(long)]
        marker: Option<String>,
    },

    /// List changed package roots, one per line.
    #[command(visible_alias = "c")]
    Changed {
        /// Only staged files.
        #[arg(long, conflicts_with = "all")]
        staged: bool,

        /// Staged, unstaged and untracked files (default).
        #[arg(long)]
        all: bool,
    },

    /// Run as a tool-use hook, reading the JSON payload from stdin.
    Hook,

    /// Run documentation and test steps for changed packages.
    #[command(visible_alias = "r")]
    Check {
        /// Which changes to check and how failures are treated.
        #[arg(short, long, value_enum, default_value = "pr")]
        mode: ModeArg,
    },

    /// Show which mode a command text selects.
    Mode {
        /// Command text, e.g. "git commit -m wip".
        command: String,
    },

    /// Initialize pkg-precommit configuration.
    #[command(visible_alias = "i")]
    Init {
        /// Use a preset configuration.
        #[arg(
            short,
            long,
            value_parser = clap::builder::PossibleValuesParser::new(crate::presets::available().iter().copied())
        )]
        preset: Option<String>,

        /// Overwrite existing configuration.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration file.
    #[command(visible_alias = "v")]
    Validate,

    /// Show configuration file location and contents.
    Config {
        /// Output raw TOML.
        #[arg(long)]
        raw: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Commands {
    fn scope(staged: bool) -> ChangeScope {
        if staged {
            ChangeScope::Staged
        } else {
            ChangeScope::All
        }
    }
}

/// Runs the CLI.
pub async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);
    setup_color(cli.color);

    let dir = working_dir(cli.dir.as_deref())?;

    match cli.command {
        Commands::Root { path, marker } => commands::root(&dir, &path, marker.as_deref()),
        Commands::Changed { staged, all: _ } => commands::changed(&dir, Commands::scope(staged)),
        Commands::Hook => commands::hook(&dir).await,
        Commands::Check { mode } => commands::check(&dir, mode.into()).await,
        Commands::Mode { command } => commands::mode(&dir, &command),
        Commands::Init { preset, force } => commands::init(&dir, preset.as_deref(), force),
        Commands::Validate => commands::validate(&dir),
        Commands::Config { raw } => commands::config(&dir, raw),
        Commands::Completions { shell } => {
            commands::completions(shell);
            Ok(ExitCode::SUCCESS)
        },
    }
}

/// Formats an error for stderr.
///
/// User-correctable errors get a single line; anything else also lists its
/// causes.
pub fn render_error(err: &Error) -> String {
    let mut out = format!("Error: {err}");
    if !err.is_user_error() {
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            out.push_str(&format!("\n  Caused by: {cause}"));
            source = cause.source();
        }
    }
    out
}

/// Resolves `--dir` against the current directory.
fn working_dir(dir: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().map_err(|e| Error::io("get current dir", e))?;
    Ok(dir.map_or_else(|| cwd.clone(), |d| cwd.join(d)))
}

/// Sets up logging based on verbosity flags.
fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Sets up color output.
fn setup_color(choice: ColorChoice) {
    match choice {
        ColorChoice::Always => {
            console::set_colors_enabled(true);
            console::set_colors_enabled_stderr(true);
        },
        ColorChoice::Never => {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        },
        ColorChoice::Auto => {
            // Let console crate auto-detect
        },
    }
}
