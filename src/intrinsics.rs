use glam::Vec2;
use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Scale folded into the raw→metric conversion together with the base.
///
/// Kept bit-for-bit from the shipped depth objects; its physical derivation
/// is not documented, so treat it as an opaque calibration constant.
pub const DEPTH_SCALE: f32 = 540.0 * 8.0;

/// Pinhole model of the depth camera plus the disparity conversion constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthIntrinsics {
    pub focal: Vec2,
    pub center: Vec2,
    pub base: f32,
    pub offset: f32,
}

impl Default for DepthIntrinsics {
    fn default() -> Self {
        Self {
            focal: Vec2::new(597.0, 597.0),
            center: Vec2::new(314.0, 241.0),
            base: 0.085,
            offset: 0.0011,
        }
    }
}

impl DepthIntrinsics {
    /// `1 / focal`, computed in double precision then narrowed.
    pub fn inv_focal(&self) -> Vec2 {
        Vec2::new(
            (1.0 / self.focal.x as f64) as f32,
            (1.0 / self.focal.y as f64) as f32,
        )
    }

    /// Numerator of the raw→Z conversion.
    #[inline]
    pub fn z_numerator(&self) -> f32 {
        DEPTH_SCALE * self.base
    }

    /// Metric Z for a raw sample. Not sign-corrected and not masked.
    #[inline]
    pub fn depth_to_z(&self, raw: u16) -> f32 {
        self.z_numerator() / (self.offset - raw as f32)
    }

    pub fn camera_matrix(&self) -> na::Matrix3<f32> {
        na::Matrix3::new(
            self.focal.x,
            0.0,
            self.center.x,
            0.0,
            self.focal.y,
            self.center.y,
            0.0,
            0.0,
            1.0,
        )
    }

    /// Replaces focal length and principal point, keeping base and offset.
    pub fn with_camera_matrix(self, k: &na::Matrix3<f32>) -> DepthIntrinsics {
        DepthIntrinsics {
            focal: Vec2::new(k[(0, 0)], k[(1, 1)]),
            center: Vec2::new(k[(0, 2)], k[(1, 2)]),
            ..self
        }
    }
}
