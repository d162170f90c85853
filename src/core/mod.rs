//! Core functionality for pkg-precommit.
//!
//! This module contains the main components:
//! - [`package`]: Package-root resolution
//! - [`git`]: Changed-file listing
//! - [`changes`]: Changed-package aggregation
//! - [`mode`]: Commit vs pull-request mode selection
//! - [`orchestrator`]: Per-package documentation and test runs
//! - [`error`]: Error types and result handling

pub mod changes;
pub mod error;
pub mod executor;
pub mod git;
pub mod mode;
pub mod orchestrator;
pub mod package;
pub mod step;
