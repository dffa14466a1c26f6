//! Benchmarks for the conflict engine and group resolution.
//!
//! Run with: cargo bench -p pem-core --bench engine_bench

use std::collections::BTreeMap;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pem_core::conflict::compute_conflict;
use pem_core::group::resolve_group;
use pem_core::{
    CanonicalGrid, Crs, EngineConfig, GeoTransform, LayerGroup, MemoryStore, Raster,
    RasterGrid, RasterLayerRef, ResamplingMethod, build_default_matrix,
};

fn canonical(side: usize) -> CanonicalGrid {
    CanonicalGrid::new(RasterGrid::new(
        Crs::epsg(5641),
        GeoTransform::new(0.0, side as f64 * 100.0, 100.0, 100.0),
        side,
        side,
    ))
    .expect("grid")
}

/// Deterministic pseudo-random field in `[0, 1)`.
fn field(grid: &RasterGrid, seed: u64) -> Raster {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    let data = (0..grid.len())
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1_u64 << 53) as f64
        })
        .collect();
    Raster::from_vec(grid.clone(), data).expect("raster")
}

fn bench_conflict(c: &mut Criterion) {
    let mut group = c.benchmark_group("conflict");
    let grid = canonical(256);
    for actors in [2_usize, 4, 8, 12] {
        let names: Vec<String> = (0..actors).map(|i| format!("user{i:02}")).collect();
        let rasters: BTreeMap<String, Raster> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), field(grid.grid(), i as u64)))
            .collect();
        let matrix = build_default_matrix(&names).expect("matrix");
        for parallel in [false, true] {
            let config = EngineConfig {
                parallel,
                ..EngineConfig::default()
            };
            let id = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(id, actors), &rasters, |b, rasters| {
                b.iter(|| black_box(compute_conflict(rasters, &matrix, &grid, &config)))
            });
        }
    }
    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_group");
    let grid = canonical(256);
    let coarse = RasterGrid::new(
        Crs::epsg(5641),
        GeoTransform::new(0.0, 25_600.0, 400.0, 400.0),
        64,
        64,
    );
    let store = MemoryStore::new()
        .with_raster("aligned", field(grid.grid(), 7))
        .with_raster("coarse", field(&coarse, 11));
    let layer_group = LayerGroup::new(
        "bench",
        Vec::new(),
        vec![RasterLayerRef::new("aligned"), RasterLayerRef::new("coarse")],
    )
    .expect("group");
    for method in [ResamplingMethod::Nearest, ResamplingMethod::Bilinear] {
        let config = EngineConfig {
            resampling: method,
            ..EngineConfig::default()
        };
        group.bench_function(BenchmarkId::new("two_rasters", method), |b| {
            b.iter(|| black_box(resolve_group(&layer_group, &store, &grid, &config)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_conflict, bench_resolve);
criterion_main!(benches);
