//! Per-pixel lens-distortion remap for the depth grid.
//!
//! Every destination cell stores the integer source pixel its depth is read
//! from. The table starts as the identity and is only ever replaced whole.

use std::sync::Arc;

use glam::UVec2;
use log::debug;
use parking_lot::RwLock;

use crate::calibration::{REMAP_PLANES, RemapTable};
use crate::error::{ReprojectError, Result};
use crate::types::GridSize;

fn identity_cells(grid: GridSize) -> Vec<UVec2> {
    (0..grid.height)
        .flat_map(|y| (0..grid.width).map(move |x| UVec2::new(x, y)))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistortionMap {
    grid: GridSize,
    cells: Vec<UVec2>,
}

impl DistortionMap {
    /// Identity map: every cell samples itself.
    pub fn identity(width: u32, height: u32) -> Result<DistortionMap> {
        let grid = GridSize::new(width, height)?;
        Ok(DistortionMap {
            grid,
            cells: identity_cells(grid),
        })
    }

    /// Converts a normalized table to pixel coordinates by truncating
    /// multiplication with (W, H).
    pub fn from_normalized(table: &RemapTable, grid: GridSize) -> Result<DistortionMap> {
        let values = table.validate(grid)?;
        let (w, h) = (grid.width as f32, grid.height as f32);
        let cells = values
            .chunks_exact(REMAP_PLANES)
            .enumerate()
            .map(|(index, v)| {
                let x = (v[0] * w).trunc();
                let y = (v[1] * h).trunc();
                // negated comparisons also reject NaN
                if !(x >= 0.0 && x < w && y >= 0.0 && y < h) {
                    return Err(ReprojectError::CoordinateOutOfRange {
                        index,
                        x: v[0],
                        y: v[1],
                    });
                }
                Ok(UVec2::new(x as u32, y as u32))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(DistortionMap { grid, cells })
    }

    /// Replaces the contents from `table`. On error the map is left as it was.
    pub fn update(&mut self, table: &RemapTable) -> Result<()> {
        *self = Self::from_normalized(table, self.grid)?;
        Ok(())
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    #[inline]
    pub fn lookup(&self, x: u32, y: u32) -> UVec2 {
        debug_assert!(x < self.grid.width && y < self.grid.height);
        self.cells[self.grid.index(x, y)]
    }

    pub fn cells(&self) -> &[UVec2] {
        &self.cells
    }

    pub fn is_identity(&self) -> bool {
        let w = self.grid.width;
        self.cells
            .iter()
            .enumerate()
            .all(|(i, c)| c.x == i as u32 % w && c.y == i as u32 / w)
    }
}

/// Distortion map shared between the host and the capture thread.
///
/// Readers take an `Arc` snapshot and keep it for a whole reprojection pass;
/// updates build a complete new table before swapping it in.
#[derive(Debug, Clone)]
pub struct SharedDistortionMap {
    current: Arc<RwLock<Arc<DistortionMap>>>,
}

impl SharedDistortionMap {
    pub fn new(map: DistortionMap) -> SharedDistortionMap {
        SharedDistortionMap {
            current: Arc::new(RwLock::new(Arc::new(map))),
        }
    }

    pub fn snapshot(&self) -> Arc<DistortionMap> {
        self.current.read().clone()
    }

    pub fn grid(&self) -> GridSize {
        self.current.read().grid()
    }

    pub fn update(&self, table: &RemapTable) -> Result<()> {
        let map = DistortionMap::from_normalized(table, self.grid())?;
        debug!("distortion map replaced (identity: {})", map.is_identity());
        *self.current.write() = Arc::new(map);
        Ok(())
    }

    pub fn replace(&self, map: DistortionMap) -> Result<()> {
        let expected = self.grid();
        if map.grid() != expected {
            return Err(ReprojectError::DimensionMismatch {
                expected,
                actual: map.grid(),
            });
        }
        *self.current.write() = Arc::new(map);
        Ok(())
    }

    pub fn reset(&self) {
        let grid = self.grid();
        let cells = identity_cells(grid);
        *self.current.write() = Arc::new(DistortionMap { grid, cells });
    }
}
