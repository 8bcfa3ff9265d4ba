//! Sequential vs interleaved probes across stream counts.

use coro_probe::InterleaveConfig;
use coro_probe_bench::{build_table, piecewise_rmi, probe_keys, uniform_keys};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const STREAMS: [usize; 6] = [1, 2, 4, 8, 16, 32];
const BATCH: usize = 10_000;

fn bench_chained_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("chained_lookup");
    group.throughput(Throughput::Elements(BATCH as u64));

    for size in [100_000, 10_000_000] {
        let keys = uniform_keys(size, 1);
        let table = build_table::<1>(&keys, size);
        let probes = probe_keys(&keys, BATCH, 0.5, 2);

        group.bench_with_input(BenchmarkId::new("sequential", size), &probes, |b, probes| {
            let mut results = Vec::with_capacity(probes.len());
            b.iter(|| {
                results.clear();
                table.sequential_multilookup(probes, &mut results).unwrap();
                black_box(results.len())
            });
        });

        for n_streams in STREAMS {
            let config = InterleaveConfig::new().with_n_streams(n_streams);
            group.bench_with_input(
                BenchmarkId::new(format!("interleaved_{n_streams}"), size),
                &probes,
                |b, probes| {
                    let mut results = Vec::with_capacity(probes.len());
                    b.iter(|| {
                        results.clear();
                        table.interleaved_multilookup_with(probes, &mut results, &config).unwrap();
                        black_box(results.len())
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_rmi_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("rmi_hash");
    group.throughput(Throughput::Elements(BATCH as u64));

    let keys = uniform_keys(1_000_000, 3);
    for leaves in [1_000, 1_000_000] {
        let rmi = piecewise_rmi::<1_000_000>(&keys, leaves, keys.len());
        let probes = probe_keys(&keys, BATCH, 1.0, 4);

        group.bench_with_input(BenchmarkId::new("sequential", leaves), &probes, |b, probes| {
            let mut results = Vec::with_capacity(probes.len());
            b.iter(|| {
                results.clear();
                rmi.sequential_multihash(probes, &mut results).unwrap();
                black_box(results.len())
            });
        });

        for n_streams in STREAMS {
            group.bench_with_input(
                BenchmarkId::new(format!("interleaved_{n_streams}"), leaves),
                &probes,
                |b, probes| {
                    let mut results = Vec::with_capacity(probes.len());
                    b.iter(|| {
                        results.clear();
                        rmi.interleaved_multihash(probes, &mut results, n_streams).unwrap();
                        black_box(results.len())
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_chained_lookup, bench_rmi_hash);
criterion_main!(benches);
