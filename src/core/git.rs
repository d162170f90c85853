//! Git repository operations.
//!
//! This module finds the repository root and lists changed files. The
//! repository is an explicit value passed to callers, so nothing here
//! depends on the process working directory.

use crate::core::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Which changes count as "changed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChangeScope {
    /// Only files added to the index.
    Staged,
    /// Staged and unstaged changes against `HEAD`, plus untracked files.
    #[default]
    All,
}

impl ChangeScope {
    /// Returns a short name for the scope.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Staged => "staged",
            Self::All => "all",
        }
    }
}

impl std::fmt::Display for ChangeScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Source of changed file paths.
///
/// Paths are returned absolute, in the order the source reports them.
#[cfg_attr(test, mockall::automock)]
pub trait ChangeSource {
    /// Lists changed files for the given scope.
    fn changed_files(&self, scope: ChangeScope) -> Result<Vec<PathBuf>>;
}

/// Represents a Git repository.
#[derive(Debug, Clone)]
pub struct GitRepo {
    /// Root directory of the repository (where .git is).
    root: PathBuf,
}

impl GitRepo {
    /// Discovers the Git repository containing `path`.
    pub fn discover_from(path: &Path) -> Result<Self> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(path)
            .output()
            .map_err(|e| Error::io("run git rev-parse", e))?;

        if !output.status.success() {
            return Err(Error::NotGitRepo);
        }

        let root = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .map(PathBuf::from)
            .ok_or(Error::NotGitRepo)?;

        Ok(Self { root })
    }

    /// Returns the root directory of the repository.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the list of staged files.
    pub fn staged_files(&self) -> Result<Vec<PathBuf>> {
        self.name_only("diff --cached", &["diff", "--cached", "--name-only", "-z", "--diff-filter=ACMR"])
    }

    /// Returns staged and unstaged changes relative to `HEAD`.
    ///
    /// Before the first commit there is no `HEAD`, so the index and the
    /// working tree are compared instead.
    pub fn uncommitted_files(&self) -> Result<Vec<PathBuf>> {
        if self.has_head() {
            return self.name_only("diff HEAD", &["diff", "HEAD", "--name-only", "-z", "--diff-filter=ACMR"]);
        }

        let mut files = self.staged_files()?;
        for file in self.name_only("diff", &["diff", "--name-only", "-z", "--diff-filter=ACMR"])? {
            if !files.contains(&file) {
                files.push(file);
            }
        }
        Ok(files)
    }

    /// Returns untracked files that are not ignored.
    pub fn untracked_files(&self) -> Result<Vec<PathBuf>> {
        self.name_only("ls-files", &["ls-files", "-z", "--others", "--exclude-standard"])
    }

    /// Returns true once the repository has at least one commit.
    #[must_use]
    pub fn has_head(&self) -> bool {
        Command::new("git")
            .args(["rev-parse", "--verify", "--quiet", "HEAD"])
            .current_dir(&self.root)
            .output()
            .is_ok_and(|o| o.status.success())
    }

    /// Runs a git command that prints NUL-separated repository-relative paths.
    fn name_only(&self, operation: &str, args: &[&str]) -> Result<Vec<PathBuf>> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| Error::io(format!("run git {operation}"), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::git(operation, stderr.trim().to_string()));
        }

        let files = output
            .stdout
            .split(|b| *b == b'\0')
            .filter(|entry| !entry.is_empty())
            .map(|entry| self.root.join(path_from_bytes(entry)))
            .collect();

        Ok(files)
    }
}

impl ChangeSource for GitRepo {
    fn changed_files(&self, scope: ChangeScope) -> Result<Vec<PathBuf>> {
        match scope {
            ChangeScope::Staged => self.staged_files(),
            ChangeScope::All => {
                let mut files = self.uncommitted_files()?;
                files.extend(self.untracked_files()?);
                Ok(files)
            },
        }
    }
}

/// Lists changed files whose extension is one of `extensions`.
///
/// Best effort: when the source fails (e.g. not a repository any more) the
/// failure is logged and an empty list is returned.
pub fn list_changed_files(
    source: &dyn ChangeSource,
    scope: ChangeScope,
    extensions: &[String],
) -> Vec<PathBuf> {
    match source.changed_files(scope) {
        Ok(files) => files
            .into_iter()
            .filter(|f| has_extension(f, extensions))
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, scope = %scope, "Could not list changed files");
            Vec::new()
        },
    }
}

/// Builds a path from the raw bytes git printed.
#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

/// Returns true if the file's extension matches one of `extensions` exactly.
fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed == ext))
}
