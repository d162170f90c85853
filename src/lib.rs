//! # pkg-precommit
//!
//! Changed-package resolution and pre-commit checks for repositories that
//! hold several packages.
//!
//! Given the files changed in a working tree, `pkg-precommit` finds the
//! package each file belongs to (the nearest directory holding a manifest
//! such as `DESCRIPTION`), regenerates documentation where the
//! documentation sources changed and runs each package's tests. A commit
//! only gets a warning when something fails; opening a pull request is
//! blocked.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pkg_precommit::{Config, GitRepo, Mode, Orchestrator};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> pkg_precommit::Result<()> {
//!     let repo = GitRepo::discover_from(Path::new("."))?;
//!     let config = Config::load_or_default(repo.root())?;
//!     let root = repo.root().to_path_buf();
//!
//!     let report = Orchestrator::new(config, repo, root).run(Mode::Pr).await;
//!     if let Some(summary) = report.summary(40) {
//!         eprintln!("{summary}");
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cli;
pub mod config;
pub mod core;
pub mod hook;
pub mod presets;

// Re-export main types for convenience
pub use config::Config;
pub use core::changes::ChangeSet;
pub use core::error::{Error, Result};
pub use core::git::{ChangeScope, ChangeSource, GitRepo};
pub use core::mode::{Mode, ModeMatcher};
pub use core::orchestrator::{Orchestrator, Report, Verdict};
pub use core::package::{PackageLocator, PackageRoot};
