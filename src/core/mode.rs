//! Mode selection from the triggering command text.
//!
//! A commit only warns about failing packages; opening a pull request is
//! blocked by them.

use crate::config::HookConfig;
use crate::core::error::{Error, Result};
use crate::core::git::ChangeScope;
use regex::Regex;

/// The orchestrator mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// `git commit` - staged files only, failures warn.
    Commit,
    /// `gh pr create` - all uncommitted changes, failures block.
    Pr,
}

impl Mode {
    /// Returns a human-readable name for the mode.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Pr => "pr",
        }
    }

    /// Returns the change scope inspected in this mode.
    #[must_use]
    pub const fn scope(&self) -> ChangeScope {
        match self {
            Self::Commit => ChangeScope::Staged,
            Self::Pr => ChangeScope::All,
        }
    }

    /// Returns whether failures in this mode block the triggering action.
    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        matches!(self, Self::Pr)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "commit" => Ok(Self::Commit),
            "pr" => Ok(Self::Pr),
            _ => Err(format!("Invalid mode: {s}. Expected: commit or pr")),
        }
    }
}

/// Matches command text against the configured commit and PR patterns.
#[derive(Debug)]
pub struct ModeMatcher {
    commit: Vec<Regex>,
    pr: Vec<Regex>,
}

impl ModeMatcher {
    /// Compiles the patterns from the hook configuration.
    pub fn new(config: &HookConfig) -> Result<Self> {
        Ok(Self {
            commit: compile("hook.commit_patterns", &config.commit_patterns)?,
            pr: compile("hook.pr_patterns", &config.pr_patterns)?,
        })
    }

    /// Selects the mode for a command, or `None` if it is neither.
    ///
    /// PR patterns win, so a chained `git commit && gh pr create` blocks.
    #[must_use]
    pub fn select(&self, command: &str) -> Option<Mode> {
        if self.pr.iter().any(|re| re.is_match(command)) {
            Some(Mode::Pr)
        } else if self.commit.iter().any(|re| re.is_match(command)) {
            Some(Mode::Commit)
        } else {
            None
        }
    }
}

fn compile(field: &str, patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(|e| Error::config_invalid(field, format!("{p}: {e}"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn matcher() -> ModeMatcher {
        ModeMatcher::new(&HookConfig::default()).expect("default patterns compile")
    }

    #[rstest]
    #[case("git commit -m 'fix'", Some(Mode::Commit))]
    #[case("git add R/a.R && git commit -m wip", Some(Mode::Commit))]
    #[case("cd pkg && git  commit --amend", Some(Mode::Commit))]
    #[case("gh pr create --fill", Some(Mode::Pr))]
    #[case("git commit -m x && gh pr create", Some(Mode::Pr))]
    #[case("git status", None)]
    #[case("gh pr list", None)]
    #[case("echo committed", None)]
    #[case("", None)]
    fn test_select(#[case] command: &str, #[case] expected: Option<Mode>) {
        assert_eq!(matcher().select(command), expected);
    }

    #[test]
    fn test_custom_patterns() {
        let config = HookConfig {
            commit_patterns: vec![r"\bjj\s+commit\b".to_string()],
            pr_patterns: vec![r"\bglab\s+mr\s+create\b".to_string()],
            ..HookConfig::default()
        };
        let matcher = ModeMatcher::new(&config).expect("compile");
        assert_eq!(matcher.select("jj commit -m x"), Some(Mode::Commit));
        assert_eq!(matcher.select("glab mr create"), Some(Mode::Pr));
        assert_eq!(matcher.select("git commit"), None);
    }

    #[test]
    fn test_invalid_pattern() {
        let config = HookConfig {
            pr_patterns: vec!["(unclosed".to_string()],
            ..HookConfig::default()
        };
        let err = ModeMatcher::new(&config).expect_err("should fail");
        assert!(matches!(err, Error::ConfigInvalid { ref field, .. } if field == "hook.pr_patterns"));
    }

    #[test]
    fn test_mode_properties() {
        assert_eq!(Mode::Commit.scope(), ChangeScope::Staged);
        assert_eq!(Mode::Pr.scope(), ChangeScope::All);
        assert!(!Mode::Commit.is_blocking());
        assert!(Mode::Pr.is_blocking());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("commit".parse::<Mode>(), Ok(Mode::Commit));
        assert_eq!("PR".parse::<Mode>(), Ok(Mode::Pr));
        assert!("push".parse::<Mode>().is_err());
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(Mode::Commit.to_string(), "commit");
        assert_eq!(Mode::Pr.to_string(), "pr");
    }
}
