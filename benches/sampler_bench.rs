use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use restax::session::csv::write_rows;
use restax::system::aggregate::aggregate;
use restax::system::fake::{FakeProcess, FakeProvider};
use restax::system::resolver::{Selector, resolve};
use restax::system::snapshot::{Snapshot, WallClock};
use std::hint::black_box;

fn make_table(n: usize) -> Vec<FakeProcess> {
    (0..n)
        .map(|i| {
            let name = match i % 10 {
                0 => format!("Code Helper {i}"),
                1 => format!("Spotify {i}"),
                _ => format!("proc_{i}"),
            };
            FakeProcess::new(i as u32 + 1, &name, (i % 100) as f64, (i as u64 + 1) * 4096)
        })
        .collect()
}

fn make_snapshots(n: usize) -> Vec<Snapshot> {
    let clock = WallClock::start();
    (0..n)
        .map(|i| Snapshot {
            timestamp: clock.now(),
            system_cpu_percent: (i % 100) as f64 * 1.25,
            system_memory_percent: 55.5,
            network_bytes_sent: i as u64 * 1_500,
            network_bytes_recv: i as u64 * 9_000,
            app_a_cpu_percent: 12.75,
            app_a_memory_percent: 3.2,
            app_b_cpu_percent: 0.4,
            app_b_memory_percent: 1.1,
        })
        .collect()
}

fn bench_resolve_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_aggregate_500_1000_2000");
    for size in [500usize, 1000, 2000] {
        let mut provider = FakeProvider::new(make_table(size));
        let selector = Selector::new("code");
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let matched = resolve(&mut provider, black_box(&selector))
                    .expect("resolve failed")
                    .matched;
                black_box(aggregate(&mut provider, matched).expect("aggregate failed"));
            })
        });
    }
    group.finish();
}

fn bench_csv_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("csv_write_500_1000_2000");
    for size in [500usize, 1000, 2000] {
        let snapshots = make_snapshots(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &snapshots, |b, rows| {
            b.iter(|| {
                let mut out = Vec::with_capacity(rows.len() * 128);
                write_rows(&mut out, black_box(rows)).expect("write failed");
                black_box(out);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_resolve_aggregate, bench_csv_write);
criterion_main!(benches);
