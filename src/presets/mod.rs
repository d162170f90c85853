//! Configuration presets for common package ecosystems.
//!
//! A preset picks the manifest marker, the source extensions and the
//! format/document/test commands.

/// Available preset names.
pub mod names {
    /// R packages (DESCRIPTION, devtools, testthat).
    pub const R: &str = "r";
    /// Cargo packages.
    pub const RUST: &str = "rust";
    /// Python projects (pyproject.toml, pytest).
    pub const PYTHON: &str = "python";
    /// Node.js/TypeScript packages (package.json, npm test).
    pub const NODE: &str = "node";
}

/// Returns a list of available preset names.
#[must_use]
pub const fn available() -> &'static [&'static str] {
    &[names::R, names::RUST, names::PYTHON, names::NODE]
}

/// Returns a description for a preset.
#[must_use]
pub fn description(name: &str) -> &'static str {
    match name {
        names::R => "R packages (DESCRIPTION marker, air, devtools::document, devtools::test)",
        names::RUST => "Cargo packages (Cargo.toml marker, cargo fmt, cargo doc, cargo test)",
        names::PYTHON => "Python projects (pyproject.toml marker, ruff format, pytest)",
        names::NODE => "Node.js/TypeScript packages (package.json marker, prettier, npm test)",
        _ => "Unknown preset",
    }
}
