//! Tool-use hook protocol.
//!
//! The hook receives a JSON payload on stdin describing the shell command
//! about to run, and answers with a JSON object on stdout. A failing
//! pull-request check is answered with a deny decision and exit code 2.

use crate::config::{Config, HookConfig};
use crate::core::error::{Error, Result};
use crate::core::git::GitRepo;
use crate::core::mode::{Mode, ModeMatcher};
use crate::core::orchestrator::{Orchestrator, Report, Verdict};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Exit code that makes the calling tool reject the action.
pub const BLOCKING_EXIT_CODE: u8 = 2;

/// Environment variable that skips the hook when set to `1`.
pub const SKIP_ENV_VAR: &str = "PKG_PRECOMMIT_SKIP";

/// Payload read from stdin.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    /// Top-level command text.
    #[serde(default)]
    pub command: Option<String>,
    /// Tool arguments of a tool-use hook.
    #[serde(default)]
    pub tool_input: Option<ToolInput>,
    /// Working directory of the session, if reported.
    #[serde(default)]
    pub cwd: Option<String>,
}

/// Tool arguments carrying the shell command.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolInput {
    /// Shell command about to run.
    #[serde(default)]
    pub command: Option<String>,
}

impl HookInput {
    /// Parses the payload.
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::hook_input("expected a JSON object", e))
    }

    /// Returns the triggering command text, preferring the tool input.
    #[must_use]
    pub fn command(&self) -> Option<&str> {
        self.tool_input
            .as_ref()
            .and_then(|t| t.command.as_deref())
            .or(self.command.as_deref())
    }
}

/// JSON answer written to stdout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    /// Human-readable summary shown to the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    /// Decision for the pending tool call, only set when blocking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookDecision>,
}

/// Deny decision for a pending tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookDecision {
    /// Hook event being answered.
    pub hook_event_name: String,
    /// Always `"deny"`.
    pub permission_decision: String,
    /// Why the call is denied.
    pub permission_decision_reason: String,
}

impl HookDecision {
    /// Creates a deny decision.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            hook_event_name: "PreToolUse".to_string(),
            permission_decision: "deny".to_string(),
            permission_decision_reason: reason.into(),
        }
    }
}

/// What the process should print and return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutcome {
    /// JSON to print, if any.
    pub output: Option<HookOutput>,
    /// Process exit code.
    pub exit_code: u8,
}

impl HookOutcome {
    /// Exit quietly with success.
    #[must_use]
    pub const fn silent() -> Self {
        Self {
            output: None,
            exit_code: 0,
        }
    }

    /// Translates a report into the hook answer.
    #[must_use]
    pub fn from_report(report: &Report, max_output_lines: usize) -> Self {
        let summary = report.summary(max_output_lines);

        match (report.verdict(), summary) {
            (Verdict::Clean, _) | (_, None) => Self::silent(),
            (Verdict::Block, Some(message)) => Self {
                output: Some(HookOutput {
                    system_message: Some(message.clone()),
                    hook_specific_output: Some(HookDecision::deny(message)),
                }),
                exit_code: BLOCKING_EXIT_CODE,
            },
            (Verdict::Passed | Verdict::Warn, Some(message)) => Self {
                output: Some(HookOutput {
                    system_message: Some(message),
                    hook_specific_output: None,
                }),
                exit_code: 0,
            },
        }
    }

    /// Serializes the JSON answer, if any.
    pub fn to_json(&self) -> Result<Option<String>> {
        self.output
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| Error::Internal {
                message: format!("Failed to serialize hook output: {e}"),
            })
    }

    /// Returns the blocking message, for stderr.
    #[must_use]
    pub fn block_reason(&self) -> Option<&str> {
        self.output
            .as_ref()?
            .hook_specific_output
            .as_ref()
            .map(|d| d.permission_decision_reason.as_str())
    }
}

/// Handles one hook invocation.
///
/// `dir` is used when the payload carries no `cwd`. Outside a Git
/// repository there is nothing to check and the hook stays silent. A
/// configuration that fails to load is only reported when the command looks
/// like a commit or pull request under the default patterns.
pub async fn handle(input: &HookInput, dir: &Path) -> Result<HookOutcome> {
    if std::env::var(SKIP_ENV_VAR).ok().as_deref() == Some("1") {
        tracing::info!("Skipping checks ({SKIP_ENV_VAR}=1)");
        return Ok(HookOutcome::silent());
    }

    let Some(command) = input.command() else {
        tracing::debug!("Hook payload has no command");
        return Ok(HookOutcome::silent());
    };

    let dir = input.cwd.as_deref().map_or(dir, Path::new);
    let repo = match GitRepo::discover_from(dir) {
        Ok(repo) => repo,
        Err(e) => {
            tracing::debug!(error = %e, dir = %dir.display(), "No repository, nothing to do");
            return Ok(HookOutcome::silent());
        },
    };

    let config = match Config::load_or_default(repo.root()) {
        Ok(config) => config,
        Err(e) => {
            if ModeMatcher::new(&HookConfig::default())?.select(command).is_none() {
                tracing::warn!(error = %e, command, "Ignoring unusable configuration for unrelated command");
                return Ok(HookOutcome::silent());
            }
            return Err(e);
        },
    };
    let Some(mode) = ModeMatcher::new(&config.hook)?.select(command) else {
        tracing::debug!(command, "Command is neither a commit nor a pull request");
        return Ok(HookOutcome::silent());
    };

    Ok(run_mode(config, repo, mode).await)
}

/// Runs the orchestrator for `mode` and converts the report.
pub async fn run_mode(config: Config, repo: GitRepo, mode: Mode) -> HookOutcome {
    let max_lines = config.hook.max_output_lines;
    let workdir = repo.root().to_path_buf();
    tracing::info!(mode = %mode, root = %workdir.display(), "Running package checks");

    let report = Orchestrator::new(config, repo, workdir).run(mode).await;
    HookOutcome::from_report(&report, max_lines)
}
