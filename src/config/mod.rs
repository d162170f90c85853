//! Configuration handling for pkg-precommit.
//!
//! This module provides configuration loading and validation,
//! supporting both `pkg-precommit.toml` files and sensible defaults
//! for R package repositories.

use crate::core::error::{Error, Result};
use crate::presets;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "pkg-precommit.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How packages and their sources are recognized.
    pub package: PackageConfig,
    /// Hook behavior.
    pub hook: HookConfig,
    /// Whole-tree formatter, run best effort. Omitted means disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<StepConfig>,
    /// Documentation generation, run when the doc sources changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<StepConfig>,
    /// Test step, run for every affected package.
    pub test: StepConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::for_preset(presets::names::R)
    }
}

impl Config {
    /// Loads configuration by searching upward from `start`.
    pub fn load(start: &Path) -> Result<Self> {
        let path = Self::find_config_file(start)?;
        Self::load_from(&path)
    }

    /// Loads configuration or returns defaults if not found.
    pub fn load_or_default(start: &Path) -> Result<Self> {
        match Self::find_config_file(start) {
            Ok(path) => Self::load_from(&path),
            Err(Error::ConfigNotFound { .. }) => {
                tracing::debug!(start = %start.display(), "No configuration file, using defaults");
                Ok(Self::default())
            },
            Err(e) => Err(e),
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io("read config", e))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::config_parse("Failed to parse TOML", e))?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");

        Ok(config)
    }

    /// Finds the configuration file by searching up the directory tree.
    pub fn find_config_file(start: &Path) -> Result<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| Error::ConfigNotFound {
                path: start.join(CONFIG_FILE_NAME),
            })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.package.marker.trim().is_empty() {
            return Err(Error::config_invalid("package.marker", "Marker file name is empty"));
        }

        if self.package.extensions.is_empty() {
            return Err(Error::config_invalid(
                "package.extensions",
                "At least one file extension is required",
            ));
        }

        if self.hook.commit_patterns.is_empty() && self.hook.pr_patterns.is_empty() {
            return Err(Error::config_invalid(
                "hook",
                "At least one commit or PR pattern is required",
            ));
        }

        crate::core::mode::ModeMatcher::new(&self.hook)?;

        for (field, step) in self.steps() {
            if step.run.trim().is_empty() {
                return Err(Error::config_invalid(format!("{field}.run"), "Command is empty"));
            }
            step.timeout_duration().ok_or_else(|| {
                Error::config_invalid(
                    format!("{field}.timeout"),
                    format!("Invalid duration: {}", step.timeout),
                )
            })?;
        }

        Ok(())
    }

    /// Returns every configured step with its section name.
    fn steps(&self) -> impl Iterator<Item = (&'static str, &StepConfig)> {
        [
            ("format", self.format.as_ref()),
            ("document", self.document.as_ref()),
            ("test", Some(&self.test)),
        ]
        .into_iter()
        .filter_map(|(name, step)| step.map(|s| (name, s)))
    }

    /// Serializes the configuration as pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Internal {
            message: format!("Failed to serialize config: {e}"),
        })
    }

    /// Generates configuration for a specific preset.
    ///
    /// Unknown names fall back to the R preset.
    #[must_use]
    pub fn for_preset(preset: &str) -> Self {
        match preset {
            presets::names::RUST => rust_config(),
            presets::names::PYTHON => python_config(),
            presets::names::NODE => node_config(),
            _ => r_config(),
        }
    }
}

/// Package recognition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// File whose presence marks a package root.
    pub marker: String,
    /// Extensions (without dot) of files that count as changes.
    pub extensions: Vec<String>,
    /// Package subdirectory whose changes trigger documentation generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_dir: Option<String>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            marker: "DESCRIPTION".to_string(),
            extensions: vec!["R".to_string(), "r".to_string()],
            doc_dir: Some("R".to_string()),
        }
    }
}

/// Hook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Regexes selecting warn-only commit mode.
    pub commit_patterns: Vec<String>,
    /// Regexes selecting blocking PR mode.
    pub pr_patterns: Vec<String>,
    /// Trailing lines of step output kept per failure.
    pub max_output_lines: usize,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            commit_patterns: vec![r"\bgit\s+commit\b".to_string()],
            pr_patterns: vec![r"\bgh\s+pr\s+create\b".to_string()],
            max_output_lines: 40,
        }
    }
}

/// Configuration for a single step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    /// Shell command to run.
    pub run: String,
    /// Timeout as a humantime string (`"30s"`, `"5m"`).
    pub timeout: String,
    /// Condition for enabling the step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_if: Option<EnabledCondition>,
    /// Environment variables to set.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            run: String::new(),
            timeout: "5m".to_string(),
            enabled_if: None,
            env: HashMap::new(),
        }
    }
}

impl StepConfig {
    /// Creates a step running `run` with the given timeout.
    pub fn new(run: impl Into<String>, timeout: impl Into<String>) -> Self {
        Self {
            run: run.into(),
            timeout: timeout.into(),
            ..Self::default()
        }
    }

    /// Only enables the step when `command` is on `PATH`.
    #[must_use]
    pub fn requires_command(mut self, command: impl Into<String>) -> Self {
        self.enabled_if = Some(EnabledCondition {
            command_exists: Some(command.into()),
            ..EnabledCondition::default()
        });
        self
    }

    /// Parses the timeout.
    #[must_use]
    pub fn timeout_duration(&self) -> Option<Duration> {
        humantime::parse_duration(&self.timeout).ok()
    }
}

/// Condition for enabling a step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnabledCondition {
    /// Only run if this file exists (relative to the package root).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_exists: Option<String>,
    /// Only run if this command is on `PATH`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_exists: Option<String>,
}

/// R packages: roxygen documentation via devtools, testthat tests.
fn r_config() -> Config {
    Config {
        package: PackageConfig::default(),
        hook: HookConfig::default(),
        format: Some(StepConfig::new("air format .", "2m").requires_command("air")),
        document: Some(
            StepConfig::new("Rscript -e 'devtools::document()'", "5m").requires_command("Rscript"),
        ),
        test: StepConfig::new(
            "Rscript -e 'devtools::test(stop_on_failure = TRUE)'",
            "15m",
        ),
    }
}

/// Cargo workspaces.
fn rust_config() -> Config {
    Config {
        package: PackageConfig {
            marker: "Cargo.toml".to_string(),
            extensions: vec!["rs".to_string()],
            doc_dir: Some("src".to_string()),
        },
        hook: HookConfig::default(),
        format: Some(StepConfig::new("cargo fmt --all", "2m").requires_command("cargo")),
        document: Some(StepConfig::new("cargo doc --no-deps", "10m")),
        test: StepConfig::new("cargo test", "15m"),
    }
}

/// Python projects with a pyproject.toml per package.
fn python_config() -> Config {
    Config {
        package: PackageConfig {
            marker: "pyproject.toml".to_string(),
            extensions: vec!["py".to_string()],
            doc_dir: None,
        },
        hook: HookConfig::default(),
        format: Some(StepConfig::new("ruff format .", "2m").requires_command("ruff")),
        document: None,
        test: StepConfig::new("pytest -q", "15m"),
    }
}

/// Node.js/TypeScript workspaces.
fn node_config() -> Config {
    Config {
        package: PackageConfig {
            marker: "package.json".to_string(),
            extensions: ["js", "jsx", "ts", "tsx"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            doc_dir: None,
        },
        hook: HookConfig::default(),
        format: Some(StepConfig::new("npx prettier --write .", "2m").requires_command("npx")),
        document: None,
        test: StepConfig::new("npm test", "15m"),
    }
}
