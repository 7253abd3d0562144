//! Capture backends.
//!
//! A [`DepthSource`] stands in for a device driver: the capture thread pumps
//! it, and it hands finished frames to a [`FrameSink`] by reference. Sources
//! own their back buffers and reuse them between frames.

pub mod replay;
pub mod simulated;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ReprojectError, Result};
use crate::types::{ColorFrame, GridSize, RawDepthFrame};

pub use replay::ReplaySource;
pub use simulated::SimulatedSource;

/// Receiver of capture callbacks. Called from the capture thread.
pub trait FrameSink: Send + Sync {
    fn on_depth(&self, frame: &RawDepthFrame);
    fn on_color(&self, frame: &ColorFrame);
}

pub trait DepthSource: Send {
    fn name(&self) -> String;

    fn grid(&self) -> GridSize;

    /// Runs one round of device event processing, delivering any completed
    /// frames to `sink`. Returns `Ok(false)` once the source is exhausted.
    fn process_events(&mut self, sink: &dyn FrameSink) -> Result<bool>;
}

/// Backend selection made when a session is composed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    Simulated {
        seed: u64,
        frame_interval_ms: Option<u64>,
        max_frames: Option<u64>,
    },
    Replay {
        folder: PathBuf,
        looping: bool,
        frame_interval_ms: Option<u64>,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Simulated {
            seed: 0,
            frame_interval_ms: Some(33),
            max_frames: None,
        }
    }
}

pub fn open_source(config: &SourceConfig, grid: GridSize) -> Result<Box<dyn DepthSource>> {
    match config {
        SourceConfig::Simulated {
            seed,
            frame_interval_ms,
            max_frames,
        } => {
            let mut source = SimulatedSource::new(grid, *seed)?;
            source.frame_interval = frame_interval_ms.map(Duration::from_millis);
            source.max_frames = *max_frames;
            Ok(Box::new(source))
        }
        SourceConfig::Replay {
            folder,
            looping,
            frame_interval_ms,
        } => {
            let mut source = ReplaySource::open(folder)?;
            if source.grid() != grid {
                return Err(ReprojectError::DimensionMismatch {
                    expected: grid,
                    actual: source.grid(),
                });
            }
            source.looping = *looping;
            source.frame_interval = frame_interval_ms.map(Duration::from_millis);
            Ok(Box::new(source))
        }
    }
}
