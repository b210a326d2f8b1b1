//! Flatten and rebuild benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use entimap_bench::{generate_invoices, generate_people};
use entimap_core::{Config, Registry};
use entimap_testkit::{Invoice, Person};

/// Benchmark flattening people with growing phone lists.
fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("flatten");
    let registry = Registry::new(Config::default());

    for phones in [0, 4, 16, 64].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("person", phones), phones, |b, &phones| {
            let person = generate_people(1, phones).remove(0);
            b.iter(|| {
                let record = registry.flatten(black_box(&person)).unwrap();
                black_box(record);
            });
        });
    }

    group.bench_function("invoice_nested", |b| {
        let invoice = generate_invoices(1, 32).remove(0);
        b.iter(|| {
            let record = registry.flatten(black_box(&invoice)).unwrap();
            black_box(record);
        });
    });
    group.finish();
}

/// Benchmark rebuilding from prepared records.
fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebuild");
    let registry = Registry::new(Config::default());

    for phones in [0, 4, 16, 64].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("person", phones), phones, |b, &phones| {
            let person = generate_people(1, phones).remove(0);
            let record = registry.flatten(&person).unwrap();
            b.iter(|| {
                let rebuilt: Person = registry.rebuild(black_box(&record)).unwrap();
                black_box(rebuilt);
            });
        });
    }

    group.bench_function("invoice_nested", |b| {
        let invoice = generate_invoices(1, 32).remove(0);
        let record = registry.flatten(&invoice).unwrap();
        b.iter(|| {
            let rebuilt: Invoice = registry.rebuild(black_box(&record)).unwrap();
            black_box(rebuilt);
        });
    });
    group.finish();
}

/// Benchmark rebuilding into a reused entity.
fn bench_rebuild_into(c: &mut Criterion) {
    let registry = Registry::new(Config::default());
    let person = generate_people(1, 16).remove(0);
    let record = registry.flatten(&person).unwrap();

    c.bench_function("rebuild_into/person/16", |b| {
        let mut target = Person::default();
        b.iter(|| {
            registry.rebuild_into(black_box(&record), &mut target).unwrap();
        });
    });
}

/// Benchmark describing a type on a fresh registry versus a warm one.
fn bench_describe(c: &mut Criterion) {
    let mut group = c.benchmark_group("describe");

    group.bench_function("cold", |b| {
        b.iter(|| {
            let registry = Registry::new(Config::default());
            black_box(registry.describe::<Invoice>().unwrap());
        });
    });

    group.bench_function("warm", |b| {
        let registry = Registry::new(Config::default());
        registry.describe::<Invoice>().unwrap();
        b.iter(|| {
            black_box(registry.describe::<Invoice>().unwrap());
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_flatten,
    bench_rebuild,
    bench_rebuild_into,
    bench_describe
);
criterion_main!(benches);
