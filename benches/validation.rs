//! Benchmarks for input validation.
//!
//! Every selection passes through these checks before any subprocess runs,
//! and interactive discovery validates many paths at once.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use repo_mount::selection::SelectionSpec;
use repo_mount::validation::{sanitize_argument_list, validate_branch_name, validate_path};

const BRANCHES: &[(&str, &str)] = &[
    ("short", "main"),
    ("nested", "feature/login/oauth-callback"),
    ("injected", "main; rm -rf /"),
];

const ARGUMENTS: &str =
    "--verbose --output-format=json $(whoami) --max-turns=1 a b c d e f g h i j k";

fn bench_branch_names(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_branch_name");
    for (label, branch) in BRANCHES {
        group.bench_with_input(BenchmarkId::from_parameter(label), branch, |b, branch| {
            b.iter(|| validate_branch_name(black_box(branch)))
        });
    }
    group.finish();
}

fn bench_paths(c: &mut Criterion) {
    c.bench_function("validate_path_absolute", |b| {
        b.iter(|| validate_path(black_box("/home/dev/code/./group/api")))
    });
    c.bench_function("validate_path_traversal", |b| {
        b.iter(|| validate_path(black_box("/home/dev/code/../../etc")))
    });
}

fn bench_arguments(c: &mut Criterion) {
    c.bench_function("sanitize_argument_list", |b| {
        b.iter(|| sanitize_argument_list(black_box(Some(ARGUMENTS))))
    });
}

fn bench_selection_parsing(c: &mut Criterion) {
    c.bench_function("selection_spec_parse", |b| {
        b.iter(|| black_box("web=/home/dev/code/web@feature/login").parse::<SelectionSpec>())
    });
}

criterion_group!(
    benches,
    bench_branch_names,
    bench_paths,
    bench_arguments,
    bench_selection_parsing
);
criterion_main!(benches);
