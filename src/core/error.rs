//! Error types for pkg-precommit.
//!
//! This module defines all errors that can occur during operation.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in pkg-precommit.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Configuration errors
    // =========================================================================
    /// Configuration file not found.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path where config was expected.
        path: PathBuf,
    },

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        /// Description of the parse error.
        message: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    ConfigInvalid {
        /// Field name that is invalid.
        field: String,
        /// Description of why it's invalid.
        message: String,
    },

    // =========================================================================
    // Git errors
    // =========================================================================
    /// Not in a Git repository.
    #[error("Not in a Git repository")]
    NotGitRepo,

    /// Git operation failed.
    #[error("Git operation failed: {operation} - {message}")]
    GitOperation {
        /// Name of the operation that failed.
        operation: String,
        /// Error message.
        message: String,
    },

    // =========================================================================
    // Package resolution errors
    // =========================================================================
    /// No directory between the path and the filesystem root holds a marker.
    #[error("No package found for {path} (looked for {marker})")]
    NoPackageFound {
        /// Path the search started from.
        path: PathBuf,
        /// Marker file name that was searched for.
        marker: String,
    },

    // =========================================================================
    // Hook errors
    // =========================================================================
    /// Hook payload on stdin could not be decoded.
    #[error("Invalid hook input: {message}")]
    HookInput {
        /// Description of what was wrong.
        message: String,
        /// Source error.
        #[source]
        source: serde_json::Error,
    },

    // =========================================================================
    // I/O errors
    // =========================================================================
    /// File I/O error.
    #[error("I/O error: {message}")]
    Io {
        /// Description of what failed.
        message: String,
        /// Source error.
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Internal errors
    // =========================================================================
    /// Internal error (should never happen).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Creates a new configuration parse error.
    pub fn config_parse(message: impl Into<String>, source: toml::de::Error) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source,
        }
    }

    /// Creates a new invalid configuration error.
    pub fn config_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a new I/O error with context.
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Creates a new Git operation error.
    pub fn git(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GitOperation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a new hook input error.
    pub fn hook_input(message: impl Into<String>, source: serde_json::Error) -> Self {
        Self::HookInput {
            message: message.into(),
            source,
        }
    }

    /// Returns true if this is a user-correctable error.
    ///
    /// Other errors are reported with their full cause chain.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. }
                | Self::ConfigInvalid { .. }
                | Self::NotGitRepo
                | Self::NoPackageFound { .. }
                | Self::HookInput { .. }
        )
    }

    /// Returns an exit code appropriate for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigNotFound { .. } | Self::ConfigParse { .. } | Self::ConfigInvalid { .. } => {
                78
            }, // EX_CONFIG
            Self::NotGitRepo | Self::GitOperation { .. } | Self::HookInput { .. } => 65, // EX_DATAERR
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toml_error() -> toml::de::Error {
        toml::from_str::<toml::Table>("[broken").expect_err("invalid toml")
    }

    fn json_error() -> serde_json::Error {
        serde_json::from_str::<serde_json::Value>("{not json").expect_err("should fail")
    }

    // =========================================================================
    // Display tests
    // =========================================================================

    #[test]
    fn test_display_config_not_found() {
        let err = Error::ConfigNotFound {
            path: PathBuf::from("/repo/pkg-precommit.toml"),
        };
        assert_eq!(
            err.to_string(),
            "Configuration file not found: /repo/pkg-precommit.toml"
        );
    }

    #[test]
    fn test_display_config_invalid() {
        let err = Error::config_invalid("test.timeout", "Invalid duration");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: test.timeout - Invalid duration"
        );
    }

    #[test]
    fn test_display_no_package_found() {
        let err = Error::NoPackageFound {
            path: PathBuf::from("/tmp/loose.R"),
            marker: "DESCRIPTION".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No package found for /tmp/loose.R (looked for DESCRIPTION)"
        );
    }

    #[test]
    fn test_display_git_operation() {
        let err = Error::git("diff --cached", "bad revision");
        assert_eq!(
            err.to_string(),
            "Git operation failed: diff --cached - bad revision"
        );
    }

    #[test]
    fn test_display_hook_input() {
        let err = Error::hook_input("expected a JSON object", json_error());
        assert_eq!(err.to_string(), "Invalid hook input: expected a JSON object");
    }

    // =========================================================================
    // Exit codes
    // =========================================================================

    #[test]
    fn test_exit_code_config() {
        assert_eq!(Error::config_parse("x", toml_error()).exit_code(), 78);
        assert_eq!(Error::config_invalid("a", "b").exit_code(), 78);
    }

    #[test]
    fn test_exit_code_data_errors() {
        assert_eq!(Error::NotGitRepo.exit_code(), 65);
        assert_eq!(Error::git("op", "msg").exit_code(), 65);
        assert_eq!(Error::hook_input("bad", json_error()).exit_code(), 65);
    }

    #[test]
    fn test_exit_code_default() {
        let err = Error::NoPackageFound {
            path: PathBuf::from("x"),
            marker: "DESCRIPTION".to_string(),
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(
            Error::Internal {
                message: "x".into()
            }
            .exit_code(),
            1
        );
    }

    // =========================================================================
    // Classification and sources
    // =========================================================================

    #[test]
    fn test_is_user_error() {
        assert!(Error::NotGitRepo.is_user_error());
        assert!(Error::config_invalid("a", "b").is_user_error());
        assert!(!Error::git("op", "msg").is_user_error());
        assert!(!Error::io("x", std::io::Error::other("y")).is_user_error());
    }

    #[test]
    fn test_error_sources() {
        use std::error::Error as StdError;
        assert!(Error::io("x", std::io::Error::other("inner"))
            .source()
            .is_some());
        assert!(Error::hook_input("x", json_error()).source().is_some());
        assert!(Error::config_parse("msg", toml_error()).source().is_some());
    }
}
