//! Benchmarks for projection and binning of point batches.
//!
//! Run with: cargo bench --package grid-processor --bench aggregate_benchmarks

use ais_common::HeatmapConfig;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use grid_processor::DensityGrid;
use projection::project_points;
use rand::Rng;

/// Points scattered around a few coastal hot spots, like an hour of AIS.
fn coastal_points(n: usize) -> (Vec<f32>, Vec<f32>) {
    let hubs: [(f32, f32); 5] = [(-74.0, 40.6), (-118.2, 33.7), (-90.0, 29.0), (-122.4, 37.8), (-80.1, 25.8)];
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| {
            let (lon, lat) = hubs[rng.gen_range(0..hubs.len())];
            (lon + rng.gen_range(-3.0..3.0), lat + rng.gen_range(-2.0..2.0))
        })
        .unzip()
}

fn bench_accumulate(c: &mut Criterion) {
    let config = HeatmapConfig::default();
    let mut group = c.benchmark_group("project_and_bin");

    for &n in &[10_000usize, 250_000, 1_000_000] {
        let (lons, lats) = coastal_points(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let mut grid = DensityGrid::for_canvas(&config.canvas);
                let (xs, ys) = project_points(black_box(&lons), black_box(&lats));
                grid.accumulate(&xs, &ys)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_accumulate);
criterion_main!(benches);
