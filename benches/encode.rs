//! Benchmarks for the batching and encoding pipeline.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use enlace::graph::{BatchOptions, GraphBuilder};
use enlace::mpn::{Mpn, MpnConfig};

const NOTATIONS: &[&str] = &[
    "CCO",
    "c1ccccc1",
    "CC(=O)O",
    "CC(=O)Nc1ccc(O)cc1",
    "CC(C)Cc1ccc(cc1)C(C)C(=O)O",
    "C1CCC(CC1)N",
    "CCOC(=O)c1ccccc1",
    "Cc1ccccc1C",
];

fn batch(size: usize) -> Vec<&'static str> {
    (0..size).map(|i| NOTATIONS[i % NOTATIONS.len()]).collect()
}

fn bench_mol2graph_cold(c: &mut Criterion) {
    let mut group = c.benchmark_group("mol2graph_cold");

    for &size in &[8, 32, 128] {
        group.throughput(Throughput::Elements(size as u64));
        let notations = batch(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                // Fresh builder each round so the cache never helps.
                let mut builder = GraphBuilder::with_cache_capacity(BatchOptions::default(), 0);
                builder.mol2graph(black_box(&notations)).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_mol2graph_warm(c: &mut Criterion) {
    let mut group = c.benchmark_group("mol2graph_warm");

    for &size in &[8, 32, 128] {
        group.throughput(Throughput::Elements(size as u64));
        let notations = batch(size);
        let mut builder = GraphBuilder::new(BatchOptions::default());
        builder.mol2graph(&notations).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| builder.mol2graph(black_box(&notations)).unwrap());
        });
    }

    group.finish();
}

fn bench_mpn_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpn_forward");

    let mut builder = GraphBuilder::new(BatchOptions::default());
    let graph = builder.mol2graph(&batch(32)).unwrap();

    for &hidden in &[64, 128, 256] {
        group.throughput(Throughput::Elements(graph.n_mols() as u64));
        let mpn = Mpn::new(
            MpnConfig::default()
                .with_hidden_size(hidden)
                .with_seed(42),
        )
        .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(hidden), &hidden, |b, _| {
            b.iter(|| mpn.forward(black_box(&graph)));
        });
    }

    group.finish();
}

fn bench_mpn_forward_virtual_edges(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpn_forward_virtual_edges");

    let options = BatchOptions {
        virtual_edges: true,
        ..BatchOptions::default()
    };
    let mut builder = GraphBuilder::new(options);
    let graph = builder.mol2graph(&batch(32)).unwrap();

    let mut config = MpnConfig::default().with_hidden_size(128).with_seed(42);
    config.virtual_edges = true;
    let mpn = Mpn::new(config).unwrap();

    group.throughput(Throughput::Elements(graph.n_mols() as u64));
    group.bench_function("hidden_128", |b| {
        b.iter(|| mpn.forward(black_box(&graph)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_mol2graph_cold,
    bench_mol2graph_warm,
    bench_mpn_forward,
    bench_mpn_forward_virtual_edges
);
criterion_main!(benches);
