use criterion::{Criterion, black_box, criterion_group, criterion_main};
use depth_point_cloud::reproject::DepthOutputs;
use depth_point_cloud::{
    DepthIntrinsics, DistortionMap, GridSize, LensCalibration, RawDepthFrame, RemapTable,
    ReprojectionEngine, reproject_into,
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn random_frame(grid: GridSize) -> RawDepthFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let data = (0..grid.len()).map(|_| rng.random_range(400..1100u16)).collect();
    RawDepthFrame::from_vec(grid, data).unwrap()
}

fn lens() -> LensCalibration {
    LensCalibration {
        intrinsic: [597.0, 0.0, 314.0, 0.0, 597.0, 241.0, 0.0, 0.0, 1.0],
        distortion: [-0.12, 0.03, 0.0005, -0.0003, 0.0],
    }
}

fn bench_reproject_into(c: &mut Criterion) {
    let grid = GridSize::default();
    let raw = random_frame(grid);
    let table = RemapTable::from_lens_model(&lens(), grid).unwrap();
    let map = DistortionMap::from_normalized(&table, grid).unwrap();
    let intrinsics = DepthIntrinsics::default();
    let mut out = DepthOutputs::new(grid);

    c.bench_function("reproject_into 640x480", |b| {
        b.iter(|| {
            reproject_into(
                black_box(&raw),
                &map,
                &intrinsics,
                &mut out.cloud,
                &mut out.raw_depth,
            )
        })
    });
}

fn bench_engine_process(c: &mut Criterion) {
    let grid = GridSize::default();
    let raw = random_frame(grid);
    let engine = ReprojectionEngine::new(grid, DepthIntrinsics::default()).unwrap();

    c.bench_function("engine_process 640x480", |b| {
        b.iter(|| engine.process(black_box(&raw)))
    });
}

fn bench_remap_generation(c: &mut Criterion) {
    let grid = GridSize::default();
    let calib = lens();

    c.bench_function("remap_from_lens_model 640x480", |b| {
        b.iter(|| RemapTable::from_lens_model(black_box(&calib), grid).unwrap())
    });
}

criterion_group!(
    benches,
    bench_reproject_into,
    bench_engine_process,
    bench_remap_generation
);
criterion_main!(benches);
