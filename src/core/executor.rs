//! Command execution for running steps.
//!
//! This module runs shell commands with a timeout and captures their
//! output. Nothing here decides what a failure means.

use crate::core::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;

/// Exit code reported for a command killed on timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// How long to keep reading output after a timed-out command was killed.
const KILL_GRACE: Duration = Duration::from_millis(500);

/// Output from a command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code of the command.
    pub exit_code: i32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Whether the command was killed due to timeout.
    pub timed_out: bool,
    /// Duration the command took to run.
    pub duration: Duration,
}

impl CommandOutput {
    /// Returns true if the command succeeded (exit code 0).
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Returns combined stdout and stderr output.
    #[must_use]
    pub fn combined_output(&self) -> String {
        match (self.stdout.trim_end(), self.stderr.trim_end()) {
            (out, "") => out.to_string(),
            ("", err) => err.to_string(),
            (out, err) => format!("{out}\n{err}"),
        }
    }
}

/// Options for command execution.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Working directory for the command.
    pub cwd: Option<PathBuf>,
    /// Timeout for the command.
    pub timeout: Option<Duration>,
    /// Environment variables to set.
    pub env: Vec<(String, String)>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            timeout: Some(Duration::from_secs(300)),
            env: Vec::new(),
        }
    }
}

impl ExecuteOptions {
    /// Sets the working directory.
    #[must_use]
    pub fn cwd(mut self, path: impl AsRef<Path>) -> Self {
        self.cwd = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Executor for running shell commands.
#[derive(Debug, Default)]
pub struct Executor;

impl Executor {
    /// Creates a new executor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Executes a shell command, capturing stdout and stderr.
    pub async fn execute(&self, command: &str, options: &ExecuteOptions) -> Result<CommandOutput> {
        let start = Instant::now();

        let (shell, shell_arg) = if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") };

        let mut cmd = Command::new(shell);
        cmd.arg(shell_arg)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref cwd) = options.cwd {
            cmd.current_dir(cwd);
        }

        for (key, value) in &options.env {
            cmd.env(key, value);
        }

        tracing::debug!(command, cwd = ?options.cwd, "Spawning command");
        let mut child = cmd.spawn().map_err(|e| Error::io("spawn command", e))?;

        let stdout = tokio::spawn(read_stream(child.stdout.take()));
        let stderr = tokio::spawn(read_stream(child.stderr.take()));

        let status = match options.timeout {
            Some(limit) => match timeout(limit, child.wait()).await {
                Ok(status) => Some(status),
                Err(_) => {
                    tracing::warn!(command, timeout = ?limit, "Command timed out, killing it");
                    drop(child.kill().await);
                    None
                },
            },
            None => Some(child.wait().await),
        };

        // Grandchildren of a killed shell may keep the pipes open.
        let grace = status.is_none().then_some(KILL_GRACE);
        let stdout = join_output(stdout, "stdout", grace).await?;
        let stderr = join_output(stderr, "stderr", grace).await?;

        let Some(status) = status else {
            return Ok(CommandOutput {
                exit_code: TIMEOUT_EXIT_CODE,
                stdout,
                stderr,
                timed_out: true,
                duration: start.elapsed(),
            });
        };
        let status = status.map_err(|e| Error::io("wait for command", e))?;

        Ok(CommandOutput {
            exit_code: status.code().unwrap_or(1),
            stdout,
            stderr,
            timed_out: false,
            duration: start.elapsed(),
        })
    }

    /// Checks if a command exists in PATH.
    #[must_use]
    pub fn command_exists(command: &str) -> bool {
        which::which(command).is_ok()
    }
}

/// Reads a stream to EOF, decoding it lossily.
///
/// The pipe is drained even when the output is not valid UTF-8, so the child
/// never sees a closed pipe.
async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        if let Err(e) = stream.read_to_end(&mut buf).await {
            tracing::debug!(error = %e, "Stopped reading command output");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

async fn join_output(
    mut handle: tokio::task::JoinHandle<String>,
    name: &str,
    grace: Option<Duration>,
) -> Result<String> {
    let joined = match grace {
        Some(limit) => match timeout(limit, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                handle.abort();
                return Ok(String::new());
            },
        },
        None => handle.await,
    };

    joined.map_err(|e| Error::Internal {
        message: format!("{name} task failed: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_simple_command() {
        let output = Executor::new()
            .execute("echo hello", &ExecuteOptions::default())
            .await
            .expect("should run");

        assert!(output.success());
        assert_eq!(output.stdout, "hello\n");
    }

    #[tokio::test]
    async fn test_execute_failing_command() {
        let output = Executor::new()
            .execute("echo broken >&2; exit 3", &ExecuteOptions::default())
            .await
            .expect("should complete");

        assert!(!output.success());
        assert_eq!(output.exit_code, 3);
        assert_eq!(output.combined_output(), "broken");
    }

    #[tokio::test]
    async fn test_execute_in_cwd_with_env() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        std::fs::write(temp.path().join("marker.txt"), "").expect("write");

        let options = ExecuteOptions::default()
            .cwd(temp.path())
            .env("PKG_GREETING", "hi");
        let output = Executor::new()
            .execute("ls; echo $PKG_GREETING", &options)
            .await
            .expect("should run");

        assert!(output.stdout.contains("marker.txt"));
        assert!(output.stdout.contains("hi"));
    }

    #[tokio::test]
    async fn test_execute_timeout() {
        let output = Executor::new()
            .execute(
                "sleep 10",
                &ExecuteOptions::default().timeout(Duration::from_millis(100)),
            )
            .await
            .expect("should complete");

        assert!(output.timed_out);
        assert!(!output.success());
        assert_eq!(output.exit_code, TIMEOUT_EXIT_CODE);
        assert!(output.duration < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_execute_non_utf8_output_is_drained() {
        let command = "printf 'caf\\351\\n'; i=0; while [ $i -lt 4000 ]; do echo line $i; i=$((i+1)); done; echo LAST";
        let output = Executor::new()
            .execute(command, &ExecuteOptions::default())
            .await
            .expect("should run");

        assert!(output.success(), "exit code {}", output.exit_code);
        assert!(output.stdout.starts_with("caf\u{FFFD}\n"));
        assert!(output.stdout.ends_with("LAST\n"));
    }

    #[test]
    fn test_combined_output() {
        let output = CommandOutput {
            stdout: "out\n".to_string(),
            stderr: "err\n".to_string(),
            ..CommandOutput::default()
        };
        assert_eq!(output.combined_output(), "out\nerr");
    }

    #[test]
    fn test_command_exists() {
        assert!(Executor::command_exists("sh"));
        assert!(!Executor::command_exists("definitely_not_a_real_command_12345"));
    }
}
