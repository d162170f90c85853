//! Benchmarks for pkg-precommit.

#![allow(missing_docs)]
#![allow(let_underscore_drop)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pkg_precommit::config::HookConfig;
use pkg_precommit::{ChangeSet, Config, ModeMatcher, PackageLocator};
use std::path::PathBuf;
use tempfile::TempDir;

fn benchmark_aggregation(c: &mut Criterion) {
    let temp = TempDir::new().expect("create temp dir");
    for i in 0..20 {
        let pkg = temp.path().join(format!("pkgs/pkg{i}"));
        std::fs::create_dir_all(pkg.join("R")).expect("create package");
        std::fs::write(pkg.join("DESCRIPTION"), format!("Package: pkg{i}\n")).expect("write");
    }

    let files: Vec<PathBuf> = (0..500)
        .map(|n| PathBuf::from(format!("pkgs/pkg{}/R/file{n}.R", n % 20)))
        .collect();
    let locator = PackageLocator::new("DESCRIPTION", temp.path());

    c.bench_function("aggregate_500_files", |b| {
        b.iter(|| {
            let changes = ChangeSet::aggregate(&locator, black_box(&files));
            black_box(changes.len())
        });
    });
}

fn benchmark_mode_selection(c: &mut Criterion) {
    let matcher = ModeMatcher::new(&HookConfig::default()).expect("default patterns compile");
    let commands = [
        "git commit -m 'fix: handle empty input'",
        "git add . && git commit && gh pr create --fill",
        "cargo test --workspace",
    ];

    c.bench_function("mode_selection", |b| {
        b.iter(|| {
            for command in &commands {
                black_box(matcher.select(black_box(command)));
            }
        });
    });
}

fn benchmark_config_parsing(c: &mut Criterion) {
    let toml_content = Config::default().to_toml().expect("serialize defaults");

    c.bench_function("config_parsing", |b| {
        b.iter(|| {
            let config: Config = toml::from_str(black_box(&toml_content)).expect("parse config");
            black_box(config)
        });
    });
}

criterion_group!(
    benches,
    benchmark_aggregation,
    benchmark_mode_selection,
    benchmark_config_parsing
);
criterion_main!(benches);
