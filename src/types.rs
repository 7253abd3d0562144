use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{ReprojectError, Result};

pub const DEPTH_WIDTH: u32 = 640;
pub const DEPTH_HEIGHT: u32 = 480;

/// Raw readings at or above this value are outside the sensor's range.
pub const SATURATED_DEPTH: u16 = 2047;

/// Fixed shape shared by every buffer of a pipeline. Row-major, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    pub fn new(width: u32, height: u32) -> Result<GridSize> {
        let grid = GridSize { width, height };
        grid.validate()?;
        Ok(grid)
    }

    pub fn validate(&self) -> Result<()> {
        let overflow = (self.width as usize).checked_mul(self.height as usize).is_none();
        if self.width == 0 || self.height == 0 || overflow {
            return Err(ReprojectError::InvalidDimension {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

impl Default for GridSize {
    fn default() -> Self {
        GridSize {
            width: DEPTH_WIDTH,
            height: DEPTH_HEIGHT,
        }
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One frame of sensor-native depth samples as delivered by a capture source.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDepthFrame {
    pub grid: GridSize,
    pub data: Vec<u16>,
    pub timestamp: u32,
}

impl RawDepthFrame {
    pub fn new(grid: GridSize) -> RawDepthFrame {
        RawDepthFrame {
            grid,
            data: vec![0; grid.len()],
            timestamp: 0,
        }
    }

    pub fn from_vec(grid: GridSize, data: Vec<u16>) -> Result<RawDepthFrame> {
        if data.len() != grid.len() {
            return Err(ReprojectError::MalformedFrame(format!(
                "{} samples for a {} grid",
                data.len(),
                grid
            )));
        }
        Ok(RawDepthFrame {
            grid,
            data,
            timestamp: 0,
        })
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u16 {
        self.data[self.grid.index(x, y)]
    }
}

/// Camera-space points in meters, one per depth pixel, flipped for GL (-Z forward).
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudFrame {
    pub grid: GridSize,
    pub points: Vec<Vec3>,
}

impl PointCloudFrame {
    pub fn new(grid: GridSize) -> PointCloudFrame {
        PointCloudFrame {
            grid,
            points: vec![Vec3::ZERO; grid.len()],
        }
    }

    /// Flat `x y z` triples, the layout a 1-D float32 3-plane matrix expects.
    pub fn as_flat(&self) -> Vec<f32> {
        self.points.iter().flat_map(|p| p.to_array()).collect()
    }
}

/// Unrectified depth widened to 32 bits for consumers that want the raw values.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDepthPublishFrame {
    pub grid: GridSize,
    pub data: Vec<u32>,
}

impl RawDepthPublishFrame {
    pub fn new(grid: GridSize) -> RawDepthPublishFrame {
        RawDepthPublishFrame {
            grid,
            data: vec![0; grid.len()],
        }
    }
}

/// Packed RGB8 frame, passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorFrame {
    pub grid: GridSize,
    pub data: Vec<u8>,
    pub timestamp: u32,
}

impl ColorFrame {
    pub fn new(grid: GridSize) -> ColorFrame {
        ColorFrame {
            grid,
            data: vec![0; grid.len() * 3],
            timestamp: 0,
        }
    }
}
