use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use glob::glob;
use log::{info, trace};

use super::{DepthSource, FrameSink};
use crate::error::{ReprojectError, Result};
use crate::io::{RAW_DEPTH_EXT, read_raw_depth};
use crate::types::{GridSize, RawDepthFrame};

/// Lists recorded raw depth frames in `folder`, sorted by file name.
pub fn list_frames(folder: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.{}", folder.display(), RAW_DEPTH_EXT);
    let mut paths: Vec<PathBuf> = glob(&pattern)?.filter_map(|p| p.ok()).collect();
    paths.sort();
    Ok(paths)
}

/// Plays back frames recorded with [`crate::io::write_raw_depth`]. Depth only.
pub struct ReplaySource {
    folder: PathBuf,
    paths: Vec<PathBuf>,
    grid: GridSize,
    next: usize,
    depth: RawDepthFrame,
    pub looping: bool,
    pub frame_interval: Option<Duration>,
}

impl ReplaySource {
    pub fn open(folder: &Path) -> Result<ReplaySource> {
        let paths = list_frames(folder)?;
        let first = paths
            .first()
            .ok_or_else(|| ReprojectError::SourceExhausted(folder.display().to_string()))?;
        let depth = read_raw_depth(first)?;
        info!(
            "replaying {} frames ({}) from {}",
            paths.len(),
            depth.grid,
            folder.display()
        );
        Ok(ReplaySource {
            folder: folder.to_path_buf(),
            grid: depth.grid,
            paths,
            next: 0,
            depth,
            looping: false,
            frame_interval: None,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl DepthSource for ReplaySource {
    fn name(&self) -> String {
        format!("replay {}", self.folder.display())
    }

    fn grid(&self) -> GridSize {
        self.grid
    }

    fn process_events(&mut self, sink: &dyn FrameSink) -> Result<bool> {
        if self.next >= self.paths.len() {
            if !self.looping {
                return Ok(false);
            }
            self.next = 0;
        }
        if let Some(interval) = self.frame_interval {
            thread::sleep(interval);
        }
        let path = &self.paths[self.next];
        let frame = read_raw_depth(path)?;
        if frame.grid != self.grid {
            return Err(ReprojectError::DimensionMismatch {
                expected: self.grid,
                actual: frame.grid,
            });
        }
        trace!("replaying {}", path.display());
        self.depth.data.copy_from_slice(&frame.data);
        self.depth.timestamp = self.next as u32;
        self.next += 1;
        sink.on_depth(&self.depth);
        Ok(true)
    }
}
