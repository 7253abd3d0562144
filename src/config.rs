use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::calibration::LensCalibration;
use crate::error::Result;
use crate::intrinsics::DepthIntrinsics;
use crate::io::{object_from_json, object_to_json};
use crate::source::SourceConfig;
use crate::types::GridSize;

/// Everything needed to compose a pipeline and its capture source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub grid: GridSize,
    pub intrinsics: DepthIntrinsics,
    /// Publish only channels that changed since the last publish.
    pub unique: bool,
    /// Calibration dictionary JSON applied over `intrinsics`.
    pub calibration: Option<PathBuf>,
    /// Lens calibration from which a remap table is generated.
    pub lens: Option<LensCalibration>,
    /// Remap table image; wins over `lens` when both are set.
    pub remap: Option<PathBuf>,
    pub source: SourceConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            grid: GridSize::default(),
            intrinsics: DepthIntrinsics::default(),
            unique: true,
            calibration: None,
            lens: None,
            remap: None,
            source: SourceConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<PipelineConfig> {
        let config: PipelineConfig = object_from_json(path)?;
        config.grid.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        object_to_json(path, self)
    }
}
