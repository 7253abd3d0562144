//! Distortion-corrected depth → camera-space point cloud.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use glam::Vec3;
use log::{debug, trace};
use parking_lot::{RwLock, RwLockReadGuard};
use rayon::prelude::*;

use crate::calibration::RemapTable;
use crate::distortion_map::{DistortionMap, SharedDistortionMap};
use crate::double_buffer::DoubleBuffer;
use crate::error::Result;
use crate::intrinsics::DepthIntrinsics;
use crate::types::{GridSize, PointCloudFrame, RawDepthFrame, RawDepthPublishFrame};

/// Everything one reprojection pass produces.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthOutputs {
    pub cloud: PointCloudFrame,
    pub raw_depth: RawDepthPublishFrame,
}

impl DepthOutputs {
    pub fn new(grid: GridSize) -> DepthOutputs {
        DepthOutputs {
            cloud: PointCloudFrame::new(grid),
            raw_depth: RawDepthPublishFrame::new(grid),
        }
    }
}

/// Reprojects every pixel of `raw` into `cloud` and widens it into `raw_out`.
///
/// Every cell is written, saturated readings included. Panics if any buffer
/// does not match the map's grid.
pub fn reproject_into(
    raw: &RawDepthFrame,
    map: &DistortionMap,
    intrinsics: &DepthIntrinsics,
    cloud: &mut PointCloudFrame,
    raw_out: &mut RawDepthPublishFrame,
) {
    let grid = map.grid();
    assert_eq!(raw.grid, grid, "raw depth frame does not match the distortion map");
    assert_eq!(raw.data.len(), grid.len(), "raw depth frame has the wrong length");
    assert_eq!(cloud.points.len(), grid.len(), "cloud buffer has the wrong length");
    assert_eq!(raw_out.data.len(), grid.len(), "depth buffer has the wrong length");

    let inv_focal = intrinsics.inv_focal();
    let center = intrinsics.center;
    let numerator = intrinsics.z_numerator();
    let offset = intrinsics.offset;
    let w = grid.width as usize;
    let cells = map.cells();
    let samples = &raw.data;

    cloud
        .points
        .par_chunks_mut(w)
        .zip(raw_out.data.par_chunks_mut(w))
        .enumerate()
        .for_each(|(y, (cloud_row, depth_row))| {
            let v = (y as f32 - center.y) * inv_focal.y;
            for x in 0..w {
                let i = y * w + x;
                depth_row[x] = samples[i] as u32;

                let src = cells[i];
                let d = samples[grid.index(src.x, src.y)];

                let u = (x as f32 - center.x) * inv_focal.x;
                let z = numerator / (offset - d as f32);

                // flip for GL
                cloud_row[x] = Vec3::new(u * z, -(v * z), -z);
            }
        });
    cloud.grid = grid;
    raw_out.grid = grid;
}

/// Allocating form of [`reproject_into`].
pub fn reproject_frame(
    raw: &RawDepthFrame,
    map: &DistortionMap,
    intrinsics: &DepthIntrinsics,
) -> (PointCloudFrame, RawDepthPublishFrame) {
    let mut outputs = DepthOutputs::new(map.grid());
    reproject_into(raw, map, intrinsics, &mut outputs.cloud, &mut outputs.raw_depth);
    (outputs.cloud, outputs.raw_depth)
}

/// Owns the distortion map, intrinsics and double-buffered outputs of one depth grid.
pub struct ReprojectionEngine {
    grid: GridSize,
    intrinsics: RwLock<DepthIntrinsics>,
    distortion: SharedDistortionMap,
    outputs: DoubleBuffer<DepthOutputs>,
    frames: AtomicU64,
    last_pass_ns: AtomicU64,
}

impl ReprojectionEngine {
    pub fn new(grid: GridSize, intrinsics: DepthIntrinsics) -> Result<ReprojectionEngine> {
        let map = DistortionMap::identity(grid.width, grid.height)?;
        debug!("reprojection engine {} with {:?}", grid, intrinsics);
        Ok(ReprojectionEngine {
            grid,
            intrinsics: RwLock::new(intrinsics),
            distortion: SharedDistortionMap::new(map),
            outputs: DoubleBuffer::new(DepthOutputs::new(grid)),
            frames: AtomicU64::new(0),
            last_pass_ns: AtomicU64::new(0),
        })
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    pub fn intrinsics(&self) -> DepthIntrinsics {
        *self.intrinsics.read()
    }

    /// Takes effect from the next pass; a running pass keeps its copy.
    pub fn set_intrinsics(&self, intrinsics: DepthIntrinsics) {
        debug!("intrinsics set to {:?}", intrinsics);
        *self.intrinsics.write() = intrinsics;
    }

    pub fn distortion(&self) -> &SharedDistortionMap {
        &self.distortion
    }

    pub fn update_distortion(&self, table: &RemapTable) -> Result<()> {
        self.distortion.update(table)
    }

    /// Reprojects `raw` into the back slot and publishes it. Returns the
    /// 1-based sequence number of the frame.
    pub fn process(&self, raw: &RawDepthFrame) -> u64 {
        let started = Instant::now();
        let map = self.distortion.snapshot();
        let intrinsics = self.intrinsics();
        self.outputs.write(|out| {
            reproject_into(raw, &map, &intrinsics, &mut out.cloud, &mut out.raw_depth);
        });
        let elapsed = started.elapsed();
        self.last_pass_ns.store(elapsed.as_nanos() as u64, Ordering::Relaxed);
        let seq = self.frames.fetch_add(1, Ordering::AcqRel) + 1;
        trace!("depth frame {} reprojected in {:?}", seq, elapsed);
        seq
    }

    /// Most recently published outputs. Holding the guard delays the writer
    /// only once it wraps around to this slot.
    pub fn outputs(&self) -> RwLockReadGuard<'_, DepthOutputs> {
        self.outputs.read()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn last_pass_duration(&self) -> Duration {
        Duration::from_nanos(self.last_pass_ns.load(Ordering::Relaxed))
    }
}
