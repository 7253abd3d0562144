use depth_point_cloud::camera_model::{BrownConrady, LensModel, init_remap_table};
use depth_point_cloud::{
    CalibrationDict, DepthIntrinsics, DistortionMap, GridSize, LensCalibration, RemapTable,
    ReprojectError,
};
use glam::{UVec2, Vec2};
use nalgebra as na;
use serde_json::json;

fn dict(value: serde_json::Value) -> CalibrationDict {
    serde_json::from_value(value).unwrap()
}

fn lens(distortion: [f64; 5]) -> LensCalibration {
    LensCalibration {
        intrinsic: [597.0, 0.0, 320.0, 0.0, 597.0, 240.0, 0.0, 0.0, 1.0],
        distortion,
    }
}

#[test]
fn test_dict_overrides_intrinsics() {
    let d = dict(json!({
        "depth_intrinsics": [580.5, 581.0, 320.0, 236.5],
        "depth_base_and_offset": [0.075, 0.0025],
        "depth_size": [640, 480],
        "rgb_intrinsics": [520.0, 520.0, 320.0, 240.0],
        "R": [1, 0, 0, 0, 1, 0, 0, 0, 1],
        "something_else": "ignored"
    }));
    let out = d.apply(&DepthIntrinsics::default(), GridSize::default()).unwrap();
    assert_eq!(out.focal, Vec2::new(580.5, 581.0));
    assert_eq!(out.center, Vec2::new(320.0, 236.5));
    assert_eq!(out.base, 0.075);
    assert_eq!(out.offset, 0.0025);
}

#[test]
fn test_dict_partial_keeps_defaults() {
    let d = dict(json!({ "depth_base_and_offset": [0.1, 0.002] }));
    let out = d.apply(&DepthIntrinsics::default(), GridSize::default()).unwrap();
    assert_eq!(out.focal, DepthIntrinsics::default().focal);
    assert_eq!(out.base, 0.1);
}

#[test]
fn test_dict_errors() {
    let grid = GridSize::default();
    let base = DepthIntrinsics::default();

    let size = dict(json!({ "depth_size": [320, 240] }));
    assert!(matches!(
        size.apply(&base, grid),
        Err(ReprojectError::DimensionMismatch { .. })
    ));

    let short = dict(json!({ "depth_intrinsics": [1.0, 2.0] }));
    assert!(matches!(
        short.apply(&base, grid),
        Err(ReprojectError::ShapeMismatch { expected: 4, actual: 2 })
    ));

    let text = dict(json!({ "depth_base_and_offset": "0.085 0.0011" }));
    assert!(matches!(
        text.apply(&base, grid),
        Err(ReprojectError::TypeMismatch { .. })
    ));
}

#[test]
fn test_camera_matrix_round_trip() {
    let intrinsics = DepthIntrinsics::default();
    let k = intrinsics.camera_matrix();
    assert_eq!(k[(0, 0)], 597.0);
    assert_eq!(k[(1, 2)], 241.0);
    assert_eq!(k[(2, 2)], 1.0);

    let other = na::Matrix3::new(500.0, 0.0, 300.0, 0.0, 510.0, 200.0, 0.0, 0.0, 1.0);
    let replaced = intrinsics.with_camera_matrix(&other);
    assert_eq!(replaced.focal, Vec2::new(500.0, 510.0));
    assert_eq!(replaced.center, Vec2::new(300.0, 200.0));
    assert_eq!(replaced.base, intrinsics.base);
    assert_eq!(replaced.camera_matrix(), other);
}

#[test]
fn test_zero_distortion_gives_identity() {
    let grid = GridSize::default();
    let table = RemapTable::from_lens_model(&lens([0.0; 5]), grid).unwrap();
    let map = DistortionMap::from_normalized(&table, grid).unwrap();
    assert!(map.is_identity());
}

#[test]
fn test_barrel_distortion_pulls_corners_in() {
    let grid = GridSize::default();
    let calib = lens([-0.2, 0.0, 0.0, 0.0, 0.0]);
    let model = BrownConrady::from_calibration(&calib, grid.width, grid.height);
    let corner = model.distort_one(&na::Vector2::new(0.0, 0.0));
    assert!(corner[0] > 0.0 && corner[1] > 0.0);

    let table = init_remap_table(&model, grid).unwrap();
    let map = DistortionMap::from_normalized(&table, grid).unwrap();
    let c = map.lookup(0, 0);
    assert!(c.x > 0 && c.y > 0);
    // the principal point does not move
    assert_eq!(map.lookup(320, 240), UVec2::new(320, 240));
}

#[test]
fn test_strong_distortion_is_clamped() {
    let grid = GridSize::new(64, 48).unwrap();
    let calib = LensCalibration {
        intrinsic: [60.0, 0.0, 32.0, 0.0, 60.0, 24.0, 0.0, 0.0, 1.0],
        distortion: [2.0, 0.0, 0.0, 0.0, 0.0],
    };
    let table = RemapTable::from_lens_model(&calib, grid).unwrap();
    let map = DistortionMap::from_normalized(&table, grid).unwrap();
    assert_eq!(map.lookup(0, 0), UVec2::new(0, 0));
    assert_eq!(map.lookup(63, 47), UVec2::new(63, 47));
}

#[test]
fn test_lens_grid_mismatch() {
    let model = BrownConrady::from_calibration(&lens([0.0; 5]), 320, 240);
    assert!(matches!(
        init_remap_table(&model, GridSize::default()),
        Err(ReprojectError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_remap_image_round_trip() {
    let grid = GridSize::new(64, 48).unwrap();
    let calib = LensCalibration {
        intrinsic: [60.0, 0.0, 32.0, 0.0, 60.0, 24.0, 0.0, 0.0, 1.0],
        distortion: [-0.1, 0.01, 0.001, -0.001, 0.0],
    };
    let table = RemapTable::from_lens_model(&calib, grid).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("remap.png");
    table.save(&path).unwrap();

    let loaded = RemapTable::load(&path).unwrap();
    assert_eq!(loaded.grid, grid);
    let a = DistortionMap::from_normalized(&table, grid).unwrap();
    let b = DistortionMap::from_normalized(&loaded, grid).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_remap_image_keeps_boundary_values() {
    let grid = GridSize::default();
    let (w, h) = (grid.width as f32, grid.height as f32);
    let data = (0..grid.height)
        .flat_map(|y| (0..grid.width).flat_map(move |x| [x as f32 / w, y as f32 / h]))
        .collect();
    let table = RemapTable::from_f32(grid, data);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("boundary.png");
    table.save(&path).unwrap();

    let before = DistortionMap::from_normalized(&table, grid).unwrap();
    let after = DistortionMap::from_normalized(&RemapTable::load(&path).unwrap(), grid).unwrap();
    assert_eq!(after.lookup(1, 1), before.lookup(1, 1));
    assert_eq!(before, after);
}

#[test]
fn test_remap_image_rejects_out_of_range_table() {
    let grid = GridSize::new(4, 4).unwrap();
    let table = RemapTable::from_f32(grid, vec![1.0; grid.len() * 2]);
    assert!(matches!(
        table.to_image(),
        Err(ReprojectError::CoordinateOutOfRange { index: 0, .. })
    ));
}
