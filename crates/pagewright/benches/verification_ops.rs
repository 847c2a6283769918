//! Verification Benchmarks
//!
//! Benchmarks for element checks and whole-tree verification against the mock driver.
//!
//! Run with: `cargo bench --bench verification_ops`

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pagewright::mock::{MockDriver, MockElement};
use pagewright::prelude::*;

fn bench_element_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("element_check");
    let config = Config::default();

    for count in [1usize, 10, 100] {
        let driver = MockDriver::new().with_elements(".row", count);
        let checker = ElementChecker::new(&driver, &config);
        let spec = SelectorSpec::builder(".row").exact(count).build().unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(count), &spec, |bench, spec| {
            bench.iter(|| {
                let present = checker
                    .check(None, black_box(spec), Expectation::Present, Wait::Immediate)
                    .unwrap();
                black_box(present);
                driver.clear_queries();
            });
        });
    }

    group.finish();
}

/// A chain of `depth` nested sections, each holding one label
fn nested_tree(depth: usize) -> (Schemas, SchemaId, MockDriver) {
    let mut registry = SchemaRegistry::new();
    let leaf = registry
        .register("Leaf", SchemaBuilder::new().element("label", ".label").expected(["label"]))
        .unwrap();

    let mut element = MockElement::new(".section").with_child(MockElement::new(".label"));
    let mut inner = leaf;
    for level in 0..depth {
        inner = registry
            .register(
                format!("Level{level}"),
                SchemaBuilder::new()
                    .element("label", ".label")
                    .section("child", inner, ".section")
                    .expected(["label", "child"]),
            )
            .unwrap();
        element = MockElement::new(".section")
            .with_child(MockElement::new(".label"))
            .with_child(element);
    }

    let driver = MockDriver::new()
        .with_element(MockElement::new(".label"))
        .with_element(element);
    (registry.freeze().unwrap(), inner, driver)
}

fn bench_tree_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_verification");
    let config = Config::default();

    for depth in [1usize, 5, 20] {
        let (schemas, root, driver) = nested_tree(depth);
        let checker = RecursionChecker::new(&driver, &config, &schemas);

        group.bench_with_input(BenchmarkId::from_parameter(depth), &root, |bench, root| {
            bench.iter(|| {
                let report = checker.verify(black_box(*root), Duration::ZERO).unwrap();
                black_box(report.passed());
                driver.clear_queries();
            });
        });
    }

    group.finish();
}

fn bench_report_rendering(c: &mut Criterion) {
    let config = Config::default();
    let (schemas, root, driver) = nested_tree(10);
    let report = RecursionChecker::new(&driver, &config, &schemas)
        .verify(root, Duration::ZERO)
        .unwrap();

    c.bench_function("report_json", |bench| {
        bench.iter(|| black_box(report.to_json().unwrap()));
    });
    c.bench_function("report_tree", |bench| {
        bench.iter(|| black_box(report.render_tree()));
    });
}

criterion_group!(
    benches,
    bench_element_check,
    bench_tree_verification,
    bench_report_rendering
);
criterion_main!(benches);
