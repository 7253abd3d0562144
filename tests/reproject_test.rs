use depth_point_cloud::reproject::DepthOutputs;
use depth_point_cloud::{
    DEPTH_SCALE, DepthIntrinsics, DistortionMap, GridSize, PointCloudFrame, RawDepthFrame,
    RawDepthPublishFrame, RemapTable, ReprojectError, ReprojectionEngine, SATURATED_DEPTH,
    reproject_frame, reproject_into,
};
use glam::Vec3;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn random_frame(grid: GridSize, seed: u64) -> RawDepthFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let data = (0..grid.len())
        .map(|_| rng.random_range(0..=SATURATED_DEPTH))
        .collect();
    RawDepthFrame::from_vec(grid, data).unwrap()
}

fn expected_point(intrinsics: &DepthIntrinsics, x: u32, y: u32, d: u16) -> Vec3 {
    let inv = intrinsics.inv_focal();
    let u = (x as f32 - intrinsics.center.x) * inv.x;
    let v = (y as f32 - intrinsics.center.y) * inv.y;
    let z = intrinsics.depth_to_z(d);
    Vec3::new(u * z, -(v * z), -z)
}

#[test]
fn test_identity_map_invariance() {
    let grid = GridSize::default();
    let raw = random_frame(grid, 1);
    let map = DistortionMap::identity(grid.width, grid.height).unwrap();
    let intrinsics = DepthIntrinsics::default();
    let (cloud, _) = reproject_frame(&raw, &map, &intrinsics);

    for y in 0..grid.height {
        for x in 0..grid.width {
            let got = cloud.points[grid.index(x, y)];
            let want = expected_point(&intrinsics, x, y, raw.get(x, y));
            assert_eq!(got.to_array().map(f32::to_bits), want.to_array().map(f32::to_bits));
        }
    }
}

#[test]
fn test_principal_point_formula() {
    let grid = GridSize::default();
    let mut raw = RawDepthFrame::new(grid);
    let i = grid.index(314, 241);
    raw.data[i] = 500;
    let map = DistortionMap::identity(grid.width, grid.height).unwrap();
    let (cloud, _) = reproject_frame(&raw, &map, &DepthIntrinsics::default());

    let z = (DEPTH_SCALE * 0.085f32) / (0.0011f32 - 500.0f32);
    assert_eq!(DEPTH_SCALE, 4320.0);
    assert!(z < 0.0);
    let p = cloud.points[i];
    assert_eq!(p.x, 0.0);
    assert_eq!(p.y, 0.0);
    assert_eq!(p.z, -z);
    assert_eq!(cloud.as_flat()[i * 3 + 2], -z);
}

#[test]
fn test_raw_passthrough_ignores_map() {
    let grid = GridSize::new(64, 48).unwrap();
    let raw = random_frame(grid, 2);
    let table = RemapTable::from_f32(grid, [0.5 / 64.0, 0.5 / 48.0].repeat(grid.len()));
    let map = DistortionMap::from_normalized(&table, grid).unwrap();
    let intrinsics = DepthIntrinsics::default();
    let (cloud, depth) = reproject_frame(&raw, &map, &intrinsics);

    let widened: Vec<u32> = raw.data.iter().map(|d| *d as u32).collect();
    assert_eq!(depth.data, widened);

    // every pixel samples (0, 0), so all depths agree
    let z = intrinsics.depth_to_z(raw.get(0, 0));
    assert!(cloud.points.iter().all(|p| p.z == -z));
}

#[test]
fn test_saturated_depth_is_projected() {
    let grid = GridSize::new(8, 8).unwrap();
    let raw = RawDepthFrame::from_vec(grid, vec![SATURATED_DEPTH; grid.len()]).unwrap();
    let map = DistortionMap::identity(8, 8).unwrap();
    let intrinsics = DepthIntrinsics::default();
    let (cloud, depth) = reproject_frame(&raw, &map, &intrinsics);
    assert!(depth.data.iter().all(|d| *d == SATURATED_DEPTH as u32));
    assert!(cloud.points.iter().all(|p| p.z == -intrinsics.depth_to_z(SATURATED_DEPTH)));
}

#[test]
fn test_full_coverage() {
    let grid = GridSize::new(33, 17).unwrap();
    let raw = random_frame(grid, 3);
    let map = DistortionMap::identity(33, 17).unwrap();
    let mut cloud = PointCloudFrame {
        grid,
        points: vec![Vec3::NAN; grid.len()],
    };
    let mut depth = RawDepthPublishFrame {
        grid,
        data: vec![u32::MAX; grid.len()],
    };
    reproject_into(&raw, &map, &DepthIntrinsics::default(), &mut cloud, &mut depth);
    assert!(cloud.points.iter().all(|p| !p.is_nan()));
    assert!(depth.data.iter().all(|d| *d != u32::MAX));
}

#[test]
#[should_panic]
fn test_mismatched_frame_panics() {
    let map = DistortionMap::identity(8, 8).unwrap();
    let raw = RawDepthFrame::new(GridSize::new(4, 4).unwrap());
    let mut out = DepthOutputs::new(GridSize::new(8, 8).unwrap());
    reproject_into(&raw, &map, &DepthIntrinsics::default(), &mut out.cloud, &mut out.raw_depth);
}

#[test]
fn test_engine_process_is_idempotent() {
    let grid = GridSize::new(64, 48).unwrap();
    let engine = ReprojectionEngine::new(grid, DepthIntrinsics::default()).unwrap();
    let raw = random_frame(grid, 4);

    assert_eq!(engine.process(&raw), 1);
    let first = engine.outputs().clone();
    assert_eq!(engine.process(&raw), 2);
    assert_eq!(*engine.outputs(), first);
    assert_eq!(engine.frames_processed(), 2);
}

#[test]
fn test_rejected_update_leaves_output_unchanged() {
    let grid = GridSize::new(64, 48).unwrap();
    let engine = ReprojectionEngine::new(grid, DepthIntrinsics::default()).unwrap();
    let raw = random_frame(grid, 5);
    engine.process(&raw);
    let before = engine.outputs().clone();

    let wrong = GridSize::new(32, 48).unwrap();
    let table = RemapTable::from_f32(wrong, vec![0.0; wrong.len() * 2]);
    assert!(matches!(
        engine.update_distortion(&table),
        Err(ReprojectError::DimensionMismatch { .. })
    ));
    assert!(engine.distortion().snapshot().is_identity());

    engine.process(&raw);
    assert_eq!(*engine.outputs(), before);
}

#[test]
fn test_intrinsics_take_effect_next_pass() {
    let grid = GridSize::new(16, 16).unwrap();
    let engine = ReprojectionEngine::new(grid, DepthIntrinsics::default()).unwrap();
    let raw = random_frame(grid, 6);
    engine.process(&raw);
    let before = engine.outputs().cloud.clone();

    let changed = DepthIntrinsics {
        base: 0.1,
        ..Default::default()
    };
    engine.set_intrinsics(changed);
    engine.process(&raw);
    let after = engine.outputs();
    assert_ne!(after.cloud, before);
    assert_eq!(after.cloud.points[0], expected_point(&changed, 0, 0, raw.data[0]));
}
