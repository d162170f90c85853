//! Mapping changed files to the packages that own them.

use crate::core::package::{PackageLocator, PackageRoot};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Files changed inside one package.
#[derive(Debug, Clone)]
pub struct PackageChanges {
    /// The owning package.
    pub package: PackageRoot,
    /// Changed files under the package, in listed order.
    pub files: Vec<PathBuf>,
}

impl PackageChanges {
    /// Returns true if any changed file lies under `<package>/<subdir>`.
    #[must_use]
    pub fn touches(&self, subdir: &Path) -> bool {
        let dir = self.package.path.join(subdir);
        self.files.iter().any(|f| f.starts_with(&dir))
    }
}

/// Distinct package roots affected by a set of changed files.
///
/// Roots keep the order of the first file that resolved to them.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    packages: IndexMap<PathBuf, PackageChanges>,
    unresolved: Vec<PathBuf>,
}

impl ChangeSet {
    /// Groups `files` by their nearest package root.
    ///
    /// Files outside every package are skipped.
    pub fn aggregate<I, P>(locator: &PackageLocator, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut set = Self::default();

        for file in files {
            let file = file.as_ref();
            match locator.find_root(file) {
                Ok(root) => {
                    set.packages
                        .entry(root.clone())
                        .or_insert_with(|| PackageChanges {
                            package: PackageRoot::load(root, locator.marker()),
                            files: Vec::new(),
                        })
                        .files
                        .push(file.to_path_buf());
                },
                Err(e) => {
                    tracing::debug!(file = %file.display(), reason = %e, "Skipping file outside any package");
                    set.unresolved.push(file.to_path_buf());
                },
            }
        }

        set
    }

    /// Returns true if no package was affected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Returns the number of affected packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Iterates affected package roots in first-appearance order.
    pub fn roots(&self) -> impl Iterator<Item = &Path> {
        self.packages.keys().map(PathBuf::as_path)
    }

    /// Iterates affected packages with their changed files.
    pub fn packages(&self) -> impl Iterator<Item = &PackageChanges> {
        self.packages.values()
    }

    /// Files that did not resolve to any package.
    #[must_use]
    pub fn unresolved(&self) -> &[PathBuf] {
        &self.unresolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
    }

    impl Fixture {
        fn new(packages: &[&str]) -> Self {
            let temp = TempDir::new().expect("create temp dir");
            for name in packages {
                let dir = temp.path().join(name);
                std::fs::create_dir_all(dir.join("R")).expect("create package");
                std::fs::create_dir_all(dir.join("tests")).expect("create tests dir");
                std::fs::write(dir.join("DESCRIPTION"), format!("Package: {name}\n"))
                    .expect("write DESCRIPTION");
            }
            Self { temp }
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.temp.path().join(rel)
        }

        fn locator(&self) -> PackageLocator {
            PackageLocator::new("DESCRIPTION", self.temp.path())
        }

        fn aggregate(&self, files: &[&str]) -> ChangeSet {
            ChangeSet::aggregate(&self.locator(), files.iter().map(|f| self.path(f)))
        }
    }

    #[test]
    fn test_empty_input_yields_empty_set() {
        let fx = Fixture::new(&["alpha"]);
        let set = fx.aggregate(&[]);
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert_eq!(set.roots().count(), 0);
    }

    #[test]
    fn test_files_in_same_package_yield_one_root() {
        let fx = Fixture::new(&["alpha"]);
        let set = fx.aggregate(&["alpha/R/a.R", "alpha/R/b.R", "alpha/tests/test-a.R"]);

        let roots: Vec<_> = set.roots().collect();
        assert_eq!(roots, vec![fx.path("alpha").as_path()]);
        let alpha = set.packages().next().expect("one package");
        assert_eq!(alpha.files.len(), 3);
        assert_eq!(alpha.package.name, "alpha");
    }

    #[test]
    fn test_repeated_files_do_not_duplicate_roots() {
        let fx = Fixture::new(&["alpha", "beta"]);
        let set = fx.aggregate(&[
            "alpha/R/a.R",
            "beta/R/b.R",
            "alpha/R/a.R",
            "beta/R/b.R",
        ]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_roots_keep_first_appearance_order() {
        let fx = Fixture::new(&["alpha", "beta", "gamma"]);
        let set = fx.aggregate(&["gamma/R/g.R", "alpha/R/a.R", "gamma/R/h.R", "beta/R/b.R"]);

        let names: Vec<_> = set.packages().map(|p| p.package.name.as_str()).collect();
        assert_eq!(names, vec!["gamma", "alpha", "beta"]);
    }

    #[test]
    fn test_unresolved_files_are_skipped() {
        let fx = Fixture::new(&["alpha"]);
        let set = fx.aggregate(&["scripts/setup.R", "alpha/R/a.R"]);

        assert_eq!(set.len(), 1);
        assert_eq!(set.unresolved(), &[fx.path("scripts/setup.R")]);
    }

    #[test]
    fn test_touches_doc_dir() {
        let fx = Fixture::new(&["alpha", "beta"]);
        let set = fx.aggregate(&["alpha/R/a.R", "beta/tests/test-b.R"]);

        let touched: Vec<_> = set
            .packages()
            .map(|p| (p.package.name.as_str(), p.touches(Path::new("R"))))
            .collect();
        assert_eq!(touched, vec![("alpha", true), ("beta", false)]);
    }

    #[test]
    fn test_touches_does_not_match_prefix_names() {
        let fx = Fixture::new(&["alpha"]);
        let set = fx.aggregate(&["alpha/Rcpp/a.R"]);
        let alpha = set.packages().next().expect("one package");
        assert!(!alpha.touches(Path::new("R")));
    }
}
