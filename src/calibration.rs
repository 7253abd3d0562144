use std::path::Path;

use image::{DynamicImage, ImageBuffer, LumaA};
use log::{debug, warn};
use nalgebra as na;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::camera_model::{BrownConrady, init_remap_table};
use crate::distortion_map::DistortionMap;
use crate::error::{ReprojectError, Result};
use crate::intrinsics::DepthIntrinsics;
use crate::types::GridSize;

/// Planes per remap cell: normalized source x and y.
pub const REMAP_PLANES: usize = 2;

/// Cell storage of a remap table. Only `Float32` is accepted as a calibration input.
#[derive(Debug, Clone, PartialEq)]
pub enum TableData {
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Char(Vec<u8>),
    Long(Vec<i32>),
}

impl TableData {
    pub fn type_name(&self) -> &'static str {
        match self {
            TableData::Float32(_) => "float32",
            TableData::Float64(_) => "float64",
            TableData::Char(_) => "char",
            TableData::Long(_) => "long",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TableData::Float32(v) => v.len(),
            TableData::Float64(v) => v.len(),
            TableData::Char(v) => v.len(),
            TableData::Long(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Externally supplied remap: per destination cell, the normalized `[0, 1)`
/// source coordinate to sample depth from.
#[derive(Debug, Clone, PartialEq)]
pub struct RemapTable {
    pub grid: GridSize,
    pub planes: usize,
    pub data: TableData,
}

impl RemapTable {
    pub fn from_f32(grid: GridSize, data: Vec<f32>) -> RemapTable {
        RemapTable {
            grid,
            planes: REMAP_PLANES,
            data: TableData::Float32(data),
        }
    }

    /// Checks everything that must hold before a map may be built from this table.
    pub fn validate(&self, expected: GridSize) -> Result<&[f32]> {
        if self.data.is_empty() {
            return Err(ReprojectError::MissingBuffer("remap table has no data"));
        }
        if self.planes != REMAP_PLANES {
            return Err(ReprojectError::ShapeMismatch {
                expected: REMAP_PLANES,
                actual: self.planes,
            });
        }
        let values = match &self.data {
            TableData::Float32(v) => v.as_slice(),
            other => {
                return Err(ReprojectError::TypeMismatch {
                    expected: "float32",
                    actual: other.type_name(),
                });
            }
        };
        if self.grid != expected {
            return Err(ReprojectError::DimensionMismatch {
                expected,
                actual: self.grid,
            });
        }
        if values.len() != expected.len() * REMAP_PLANES {
            return Err(ReprojectError::ShapeMismatch {
                expected: expected.len() * REMAP_PLANES,
                actual: values.len(),
            });
        }
        Ok(values)
    }

    /// Remap undoing a Brown-Conrady lens on `grid`.
    pub fn from_lens_model(calib: &LensCalibration, grid: GridSize) -> Result<RemapTable> {
        let model = BrownConrady::from_calibration(calib, grid.width, grid.height);
        init_remap_table(&model, grid)
    }

    /// Reads a table baked into a 16-bit gray+alpha image. Gray holds the
    /// source column, alpha the source row; each decodes to its pixel center.
    pub fn from_image(img: &DynamicImage) -> Result<RemapTable> {
        let grid = GridSize::new(img.width(), img.height())?;
        let (w, h) = (grid.width as f32, grid.height as f32);
        let data = img
            .to_luma_alpha16()
            .pixels()
            .flat_map(|p| [(p.0[0] as f32 + 0.5) / w, (p.0[1] as f32 + 0.5) / h])
            .collect();
        Ok(RemapTable::from_f32(grid, data))
    }

    /// Bakes the table into a 16-bit gray+alpha image of source pixel indices.
    /// Stores exactly what [`DistortionMap::from_normalized`] would resolve.
    pub fn to_image(&self) -> Result<DynamicImage> {
        let too_wide = |n: u32| n > u16::MAX as u32 + 1;
        if too_wide(self.grid.width) || too_wide(self.grid.height) {
            return Err(ReprojectError::InvalidDimension {
                width: self.grid.width,
                height: self.grid.height,
            });
        }
        let map = DistortionMap::from_normalized(self, self.grid)?;
        let img = ImageBuffer::from_fn(self.grid.width, self.grid.height, |x, y| {
            let c = map.lookup(x, y);
            LumaA([c.x as u16, c.y as u16])
        });
        Ok(DynamicImage::ImageLumaA16(img))
    }

    pub fn load(path: &Path) -> Result<RemapTable> {
        let img = image::ImageReader::open(path)?.decode()?;
        RemapTable::from_image(&img)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.to_image()?.save(path)?;
        Ok(())
    }
}

/// Output of a checkerboard calibration: row-major 3x3 camera matrix and
/// OpenCV-ordered distortion `k1 k2 p1 p2 k3`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LensCalibration {
    pub intrinsic: [f64; 9],
    pub distortion: [f64; 5],
}

impl LensCalibration {
    pub fn camera_matrix(&self) -> na::Matrix3<f64> {
        na::Matrix3::from_row_slice(&self.intrinsic)
    }
}

/// Key/value calibration dictionary as produced by depth camera calibration tools.
///
/// Recognised keys: `depth_intrinsics` (`[fx, fy, cx, cy]`),
/// `depth_base_and_offset` (`[base, offset]`) and `depth_size` (`[w, h]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationDict(pub serde_json::Map<String, Value>);

const KNOWN_UNUSED_KEYS: [&str; 8] = [
    "R",
    "T",
    "depth_distortion",
    "raw_depth_size",
    "raw_rgb_size",
    "rgb_distortion",
    "rgb_intrinsics",
    "rgb_size",
];

fn floats(key: &str, value: &Value, n: usize) -> Result<Vec<f32>> {
    let values: Option<Vec<f32>> = value
        .as_array()
        .and_then(|arr| arr.iter().map(|v| v.as_f64().map(|f| f as f32)).collect());
    match values {
        Some(v) if v.len() == n => Ok(v),
        Some(v) => Err(ReprojectError::ShapeMismatch {
            expected: n,
            actual: v.len(),
        }),
        None => {
            warn!("calibration key {} is not a list of numbers", key);
            Err(ReprojectError::TypeMismatch {
                expected: "number list",
                actual: "other",
            })
        }
    }
}

impl CalibrationDict {
    pub fn load(path: &Path) -> Result<CalibrationDict> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Returns `intrinsics` overridden by the dictionary. Nothing is applied if any key fails.
    pub fn apply(&self, intrinsics: &DepthIntrinsics, grid: GridSize) -> Result<DepthIntrinsics> {
        let mut out = *intrinsics;
        for (key, value) in &self.0 {
            match key.as_str() {
                "depth_intrinsics" => {
                    let v = floats(key, value, 4)?;
                    out.focal = glam::Vec2::new(v[0], v[1]);
                    out.center = glam::Vec2::new(v[2], v[3]);
                }
                "depth_base_and_offset" => {
                    let v = floats(key, value, 2)?;
                    out.base = v[0];
                    out.offset = v[1];
                }
                "depth_size" => {
                    let v = floats(key, value, 2)?;
                    let actual = GridSize {
                        width: v[0] as u32,
                        height: v[1] as u32,
                    };
                    if actual != grid {
                        return Err(ReprojectError::DimensionMismatch {
                            expected: grid,
                            actual,
                        });
                    }
                }
                k if KNOWN_UNUSED_KEYS.contains(&k) => debug!("calibration key {} ignored", k),
                k => debug!("unknown calibration key {}", k),
            }
        }
        Ok(out)
    }
}
