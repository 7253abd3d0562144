use nalgebra as na;
use rayon::prelude::*;

use crate::calibration::RemapTable;
use crate::error::{ReprojectError, Result};
use crate::types::GridSize;

pub trait LensModel
where
    Self: Sync,
{
    fn width(&self) -> f64;
    fn height(&self) -> f64;
    /// Maps an ideal (undistorted) pixel to where the lens actually images it.
    fn distort_one(&self, p: &na::Vector2<f64>) -> na::Vector2<f64>;
    fn distort(&self, p2ds: &[na::Vector2<f64>]) -> Vec<na::Vector2<f64>> {
        p2ds.par_iter().map(|p| self.distort_one(p)).collect()
    }
}

/// Builds the normalized remap table that undoes `lens_model` on a `grid` sized depth image.
///
/// Distorted positions snap to the nearest source pixel; those outside the
/// sensor are clamped to the nearest edge so that every cell stays a valid
/// lookup. Each value points at the center of its source pixel, so truncating
/// multiplication by (W, H) recovers that pixel.
pub fn init_remap_table(lens_model: &dyn LensModel, grid: GridSize) -> Result<RemapTable> {
    grid.validate()?;
    if lens_model.width().round() as u32 != grid.width
        || lens_model.height().round() as u32 != grid.height
    {
        return Err(ReprojectError::DimensionMismatch {
            expected: grid,
            actual: GridSize {
                width: lens_model.width().round() as u32,
                height: lens_model.height().round() as u32,
            },
        });
    }
    let w = grid.width as usize;
    let p2ds: Vec<na::Vector2<f64>> = (0..grid.len())
        .map(|i| na::Vector2::new((i % w) as f64, (i / w) as f64))
        .collect();
    let distorted = lens_model.distort(&p2ds);
    let max_x = (grid.width - 1) as f64;
    let max_y = (grid.height - 1) as f64;
    let data: Vec<f32> = distorted
        .par_iter()
        .flat_map_iter(|p| {
            let snap = |v: f64, max: f64| {
                if v.is_finite() {
                    v.round().clamp(0.0, max)
                } else {
                    0.0
                }
            };
            let sx = snap(p[0], max_x);
            let sy = snap(p[1], max_y);
            [
                ((sx + 0.5) / grid.width as f64) as f32,
                ((sy + 0.5) / grid.height as f64) as f32,
            ]
        })
        .collect();
    Ok(RemapTable::from_f32(grid, data))
}
