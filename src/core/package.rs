//! Package root resolution.
//!
//! A package root is a directory holding the manifest marker file
//! (`DESCRIPTION` for R packages). Resolution walks upward from a path and
//! stops at the nearest marker.

use crate::core::error::{Error, Result};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};

/// A directory identified as a package boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageRoot {
    /// Absolute path of the package directory.
    pub path: PathBuf,
    /// Package name from the manifest, or the directory name.
    pub name: String,
}

impl PackageRoot {
    /// Builds a package root, reading the name from `marker` when possible.
    #[must_use]
    pub fn load(path: PathBuf, marker: &str) -> Self {
        let name = std::fs::read_to_string(path.join(marker))
            .ok()
            .and_then(|content| manifest_name(marker, &content))
            .or_else(|| {
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| path.display().to_string());

        Self { path, name }
    }
}

/// Finds package roots by walking up to the nearest marker file.
#[derive(Debug, Clone)]
pub struct PackageLocator {
    marker: String,
    base: PathBuf,
}

impl PackageLocator {
    /// Creates a locator. Relative paths are resolved against `base`.
    pub fn new(marker: impl Into<String>, base: impl Into<PathBuf>) -> Self {
        Self {
            marker: marker.into(),
            base: base.into(),
        }
    }

    /// Returns the marker file name.
    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Returns the nearest ancestor of `path` that contains the marker.
    ///
    /// An existing directory is searched itself first; anything else starts
    /// at its parent. The path does not need to exist.
    pub fn find_root(&self, path: &Path) -> Result<PathBuf> {
        let absolute = normalize(&self.base.join(path));

        let start = if absolute.is_dir() {
            Some(absolute.as_path())
        } else {
            absolute.parent()
        };

        for dir in start.into_iter().flat_map(|p| p.ancestors()) {
            if dir.join(&self.marker).is_file() {
                tracing::trace!(path = %path.display(), root = %dir.display(), "Resolved package root");
                return Ok(dir.to_path_buf());
            }
        }

        Err(Error::NoPackageFound {
            path: absolute,
            marker: self.marker.clone(),
        })
    }

    /// Resolves `path` and loads the package metadata.
    pub fn find_package(&self, path: &Path) -> Result<PackageRoot> {
        self.find_root(path)
            .map(|root| PackageRoot::load(root, &self.marker))
    }
}

/// Lexically removes `.` and `..` components without touching the disk.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                out.pop();
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `Cargo.toml` / `pyproject.toml` tables that carry a name.
#[derive(Debug, Default, Deserialize)]
struct TomlManifest {
    #[serde(default)]
    package: Option<NamedSection>,
    #[serde(default)]
    project: Option<NamedSection>,
}

/// `package.json`, or one section of a TOML manifest.
#[derive(Debug, Default, Deserialize)]
struct NamedSection {
    #[serde(default)]
    name: Option<String>,
}

/// Extracts a package name from a manifest, picking the format by file name.
fn manifest_name(marker: &str, content: &str) -> Option<String> {
    let name = match Path::new(marker).extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str::<TomlManifest>(content)
            .ok()
            .and_then(|m| m.package.or(m.project))
            .and_then(|section| section.name),
        Some("json") => serde_json::from_str::<NamedSection>(content)
            .ok()
            .and_then(|section| section.name),
        _ => dcf_field(content, "Package"),
    };

    name.filter(|n| !n.trim().is_empty())
}

/// Reads a top-level field of a DCF file such as R's `DESCRIPTION`.
fn dcf_field(content: &str, field: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key == field).then(|| value.trim().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const MARKER: &str = "DESCRIPTION";

    /// Creates `root/<rel>/DESCRIPTION` with the given package name.
    fn make_package(root: &Path, rel: &str, name: &str) -> PathBuf {
        let dir = root.join(rel);
        std::fs::create_dir_all(dir.join("R")).expect("create package dirs");
        std::fs::write(
            dir.join(MARKER),
            format!("Package: {name}\nVersion: 0.1.0\n"),
        )
        .expect("write DESCRIPTION");
        dir
    }

    fn locator(temp: &TempDir) -> PackageLocator {
        PackageLocator::new(MARKER, temp.path())
    }

    #[test]
    fn test_file_resolves_to_enclosing_package() {
        let temp = TempDir::new().expect("create temp dir");
        let pkg = make_package(temp.path(), "pkgs/alpha", "alpha");

        let root = locator(&temp)
            .find_root(&pkg.join("R/utils.R"))
            .expect("resolve");
        assert_eq!(root, pkg);
    }

    #[test]
    fn test_package_directory_resolves_to_itself() {
        let temp = TempDir::new().expect("create temp dir");
        let pkg = make_package(temp.path(), "alpha", "alpha");

        let root = locator(&temp).find_root(&pkg).expect("resolve");
        assert_eq!(root, pkg);
    }

    #[test]
    fn test_marker_file_resolves_to_its_directory() {
        let temp = TempDir::new().expect("create temp dir");
        let pkg = make_package(temp.path(), "alpha", "alpha");

        let root = locator(&temp)
            .find_root(&pkg.join(MARKER))
            .expect("resolve");
        assert_eq!(root, pkg);
    }

    #[test]
    fn test_resolution_is_stable_within_package() {
        let temp = TempDir::new().expect("create temp dir");
        let pkg = make_package(temp.path(), "alpha", "alpha");
        let file = pkg.join("R/deep/nested/file.R");
        let loc = locator(&temp);

        let from_file = loc.find_root(&file).expect("resolve file");
        let from_parent = loc
            .find_root(file.parent().expect("parent"))
            .expect("resolve parent");
        assert_eq!(from_file, from_parent);
    }

    #[test]
    fn test_nested_package_wins() {
        let temp = TempDir::new().expect("create temp dir");
        let outer = make_package(temp.path(), "outer", "outer");
        let inner = make_package(&outer, "inst/inner", "inner");

        let loc = locator(&temp);
        assert_eq!(loc.find_root(&inner.join("R/a.R")).expect("inner"), inner);
        assert_eq!(loc.find_root(&outer.join("R/a.R")).expect("outer"), outer);
    }

    #[test]
    fn test_outside_any_package_fails() {
        let temp = TempDir::new().expect("create temp dir");
        make_package(temp.path(), "alpha", "alpha");

        let result = locator(&temp).find_root(&temp.path().join("scripts/run.R"));
        assert!(matches!(result, Err(Error::NoPackageFound { .. })));
    }

    #[test]
    fn test_relative_path_uses_base() {
        let temp = TempDir::new().expect("create temp dir");
        let pkg = make_package(temp.path(), "alpha", "alpha");

        let root = locator(&temp)
            .find_root(Path::new("alpha/R/missing.R"))
            .expect("resolve");
        assert_eq!(root, pkg);
    }

    #[test]
    fn test_dot_segments_are_normalized() {
        let temp = TempDir::new().expect("create temp dir");
        let alpha = make_package(temp.path(), "alpha", "alpha");
        make_package(temp.path(), "beta", "beta");

        let root = locator(&temp)
            .find_root(Path::new("beta/./R/../../alpha/R/x.R"))
            .expect("resolve");
        assert_eq!(root, alpha);
    }

    #[test]
    fn test_marker_directory_is_not_a_marker() {
        let temp = TempDir::new().expect("create temp dir");
        std::fs::create_dir_all(temp.path().join("odd/DESCRIPTION")).expect("create dir");

        let result = locator(&temp).find_root(&temp.path().join("odd/a.R"));
        assert!(result.is_err());
    }

    #[test]
    fn test_find_package_reads_name() {
        let temp = TempDir::new().expect("create temp dir");
        let pkg = make_package(temp.path(), "dir-name", "realname");

        let found = locator(&temp)
            .find_package(&pkg.join("R/a.R"))
            .expect("resolve");
        assert_eq!(found.name, "realname");
        assert_eq!(found.path, pkg);
    }

    #[test]
    fn test_package_name_falls_back_to_directory() {
        let temp = TempDir::new().expect("create temp dir");
        let dir = temp.path().join("plainpkg");
        std::fs::create_dir_all(&dir).expect("create dir");
        std::fs::write(dir.join(MARKER), "Title: no package field\n").expect("write");

        let found = PackageRoot::load(dir, MARKER);
        assert_eq!(found.name, "plainpkg");
    }

    #[test]
    fn test_manifest_name_from_description() {
        assert_eq!(
            manifest_name(MARKER, "Package: tidyr\nVersion: 1.0"),
            Some("tidyr".to_string())
        );
        assert_eq!(
            manifest_name(MARKER, "Title: Package: not a field\nDescription: x"),
            None
        );
        assert_eq!(manifest_name(MARKER, "Package:   \n"), None);
    }

    #[test]
    fn test_manifest_name_from_cargo_toml() {
        let content = r#"
[[bin]]
name = "cli"

[package]
name = "serde" # the crate
version = "1.0.0"
"#;
        assert_eq!(manifest_name("Cargo.toml", content), Some("serde".to_string()));
        assert_eq!(manifest_name("Cargo.toml", "[workspace]\nmembers = []\n"), None);
    }

    #[test]
    fn test_manifest_name_from_pyproject() {
        let content = "[build-system]\nrequires = []\n\n[project]\nname = \"tidy-py\"\n";
        assert_eq!(
            manifest_name("pyproject.toml", content),
            Some("tidy-py".to_string())
        );
    }

    #[test]
    fn test_manifest_name_from_package_json() {
        let content = r#"{
  "author": { "name": "Bob" },
  "name": "left-pad",
  "version": "1.0.0"
}"#;
        assert_eq!(
            manifest_name("package.json", content),
            Some("left-pad".to_string())
        );
        assert_eq!(manifest_name("package.json", "{ not json"), None);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
    }
}
