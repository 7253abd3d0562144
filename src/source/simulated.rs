use std::thread;
use std::time::Duration;

use log::trace;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use super::{DepthSource, FrameSink};
use crate::error::Result;
use crate::intrinsics::DepthIntrinsics;
use crate::types::{ColorFrame, GridSize, RawDepthFrame, SATURATED_DEPTH};

const WALL_DISTANCE: f32 = 3.0;
const SPHERE_DISTANCE: f32 = 1.5;
const SPHERE_RADIUS: f32 = 0.4;
/// Columns at the left edge the emitter never covers.
const BLIND_COLUMNS: u32 = 8;

/// Deterministic synthetic depth camera: a wall with a sphere swinging in
/// front of it, sensor noise, and a blind band reported as saturated.
pub struct SimulatedSource {
    grid: GridSize,
    intrinsics: DepthIntrinsics,
    rng: ChaCha8Rng,
    depth: RawDepthFrame,
    color: ColorFrame,
    frame_index: u64,
    pub frame_interval: Option<Duration>,
    pub max_frames: Option<u64>,
}

impl SimulatedSource {
    pub fn new(grid: GridSize, seed: u64) -> Result<SimulatedSource> {
        grid.validate()?;
        let scale = grid.width as f32 / 640.0;
        let intrinsics = DepthIntrinsics {
            focal: glam::Vec2::splat(597.0 * scale),
            center: glam::Vec2::new(grid.width as f32 / 2.0, grid.height as f32 / 2.0),
            ..Default::default()
        };
        Ok(SimulatedSource {
            grid,
            intrinsics,
            rng: ChaCha8Rng::seed_from_u64(seed),
            depth: RawDepthFrame::new(grid),
            color: ColorFrame::new(grid),
            frame_index: 0,
            frame_interval: None,
            max_frames: None,
        })
    }

    pub fn intrinsics(&self) -> DepthIntrinsics {
        self.intrinsics
    }

    /// Raw reading whose reprojected |Z| equals `meters` under `intrinsics`.
    pub fn raw_for_distance(intrinsics: &DepthIntrinsics, meters: f32) -> u16 {
        let d = intrinsics.offset + intrinsics.z_numerator() / meters;
        d.round().clamp(0.0, SATURATED_DEPTH as f32) as u16
    }

    fn sphere_hit(&self, u: f32, v: f32, sphere_x: f32) -> Option<f32> {
        // ray p = t * (u, v, 1) against a sphere centered at (sphere_x, 0, SPHERE_DISTANCE)
        let a = u * u + v * v + 1.0;
        let b = -2.0 * (u * sphere_x + SPHERE_DISTANCE);
        let c = sphere_x * sphere_x + SPHERE_DISTANCE * SPHERE_DISTANCE
            - SPHERE_RADIUS * SPHERE_RADIUS;
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }
        Some((-b - disc.sqrt()) / (2.0 * a))
    }

    fn render(&mut self) {
        let sphere_x = 0.3 * (self.frame_index as f32 * 0.1).sin();
        let inv = self.intrinsics.inv_focal();
        let (w, h) = (self.grid.width, self.grid.height);
        for y in 0..h {
            for x in 0..w {
                let i = self.grid.index(x, y);
                let u = (x as f32 - self.intrinsics.center.x) * inv.x;
                let v = (y as f32 - self.intrinsics.center.y) * inv.y;
                let hit = self.sphere_hit(u, v, sphere_x);
                let meters = hit.unwrap_or(WALL_DISTANCE);

                self.depth.data[i] = if x < BLIND_COLUMNS {
                    SATURATED_DEPTH
                } else {
                    let noise: i32 = self.rng.random_range(-1..=1);
                    let raw = Self::raw_for_distance(&self.intrinsics, meters) as i32 + noise;
                    raw.clamp(0, SATURATED_DEPTH as i32) as u16
                };

                let rgb = if hit.is_some() {
                    [220, 40, 40]
                } else {
                    [(x * 255 / w) as u8, (y * 255 / h) as u8, 128]
                };
                self.color.data[i * 3..i * 3 + 3].copy_from_slice(&rgb);
            }
        }
        let timestamp = (self.frame_index * 33) as u32;
        self.depth.timestamp = timestamp;
        self.color.timestamp = timestamp;
    }
}

impl DepthSource for SimulatedSource {
    fn name(&self) -> String {
        format!("simulated {}", self.grid)
    }

    fn grid(&self) -> GridSize {
        self.grid
    }

    fn process_events(&mut self, sink: &dyn FrameSink) -> Result<bool> {
        if self.max_frames.is_some_and(|max| self.frame_index >= max) {
            return Ok(false);
        }
        if let Some(interval) = self.frame_interval {
            thread::sleep(interval);
        }
        self.render();
        trace!("simulated frame {}", self.frame_index);
        sink.on_color(&self.color);
        sink.on_depth(&self.depth);
        self.frame_index += 1;
        Ok(true)
    }
}
