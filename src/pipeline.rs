//! Glue between a capture source, the reprojection engine and the host.
//!
//! The capture thread drives [`FrameSink`]; the host calls [`DepthPipeline::publish`].
//! Both only touch the double-buffered outputs and the dirty-flag latch.

use log::{debug, error, info, trace};

use crate::calibration::{CalibrationDict, LensCalibration, RemapTable};
use crate::config::PipelineConfig;
use crate::distortion_map::DistortionMap;
use crate::double_buffer::DoubleBuffer;
use crate::error::{ReprojectError, Result};
use crate::intrinsics::DepthIntrinsics;
use crate::publish::{Channel, FramePublisher, Output, OutputSink};
use crate::reproject::ReprojectionEngine;
use crate::source::FrameSink;
use crate::types::{ColorFrame, GridSize, RawDepthFrame};

pub struct DepthPipeline {
    engine: ReprojectionEngine,
    color: DoubleBuffer<ColorFrame>,
    publisher: FramePublisher,
}

impl DepthPipeline {
    pub fn new(grid: GridSize, intrinsics: DepthIntrinsics) -> Result<DepthPipeline> {
        Ok(DepthPipeline {
            engine: ReprojectionEngine::new(grid, intrinsics)?,
            color: DoubleBuffer::new(ColorFrame::new(grid)),
            publisher: FramePublisher::default(),
        })
    }

    /// Builds a pipeline and applies every calibration input named by `config`.
    pub fn from_config(config: &PipelineConfig) -> Result<DepthPipeline> {
        let pipeline = DepthPipeline::new(config.grid, config.intrinsics)?;
        pipeline.set_unique(config.unique);
        if let Some(path) = &config.calibration {
            pipeline.apply_calibration(&CalibrationDict::load(path)?)?;
        }
        if let Some(path) = &config.remap {
            pipeline.set_distortion_map(&RemapTable::load(path)?)?;
        } else if let Some(lens) = &config.lens {
            pipeline.set_lens_calibration(lens)?;
        }
        info!(
            "pipeline {} ready (unique: {}, identity map: {})",
            config.grid,
            config.unique,
            pipeline.engine.distortion().snapshot().is_identity()
        );
        Ok(pipeline)
    }

    pub fn grid(&self) -> GridSize {
        self.engine.grid()
    }

    pub fn engine(&self) -> &ReprojectionEngine {
        &self.engine
    }

    pub fn publisher(&self) -> &FramePublisher {
        &self.publisher
    }

    pub fn set_unique(&self, unique: bool) {
        self.publisher.set_unique(unique);
    }

    pub fn set_intrinsics(&self, intrinsics: DepthIntrinsics) {
        self.engine.set_intrinsics(intrinsics);
    }

    pub fn set_distortion_map(&self, table: &RemapTable) -> Result<()> {
        self.engine.update_distortion(table)
    }

    pub fn set_lens_calibration(&self, lens: &LensCalibration) -> Result<()> {
        let table = RemapTable::from_lens_model(lens, self.grid())?;
        self.engine.update_distortion(&table)
    }

    pub fn reset_distortion_map(&self) -> Result<()> {
        let grid = self.grid();
        self.engine
            .distortion()
            .replace(DistortionMap::identity(grid.width, grid.height)?)
    }

    pub fn apply_calibration(&self, dict: &CalibrationDict) -> Result<()> {
        let intrinsics = dict.apply(&self.engine.intrinsics(), self.grid())?;
        debug!("calibration dictionary applied");
        self.engine.set_intrinsics(intrinsics);
        Ok(())
    }

    /// Hands the current front buffers of every pending channel to `sink`,
    /// in color, depth, cloud order. Returns the emitted channels.
    pub fn publish(&self, sink: &mut dyn OutputSink) -> Vec<Channel> {
        let pending = self.publisher.take_pending();
        if pending.is_empty() {
            return pending;
        }
        // depth and cloud come from the same pass
        let outputs = self.engine.outputs();
        for &channel in &pending {
            match channel {
                Channel::Color => {
                    let color = self.color.read();
                    sink.emit(Output::Color(&color));
                }
                Channel::Depth => sink.emit(Output::Depth(&outputs.raw_depth)),
                Channel::Cloud => sink.emit(Output::Cloud(&outputs.cloud)),
            }
        }
        trace!("published {:?}", pending);
        pending
    }
}

impl FrameSink for DepthPipeline {
    fn on_depth(&self, frame: &RawDepthFrame) {
        if frame.grid != self.grid() || frame.data.len() != self.grid().len() {
            error!(
                "{}",
                ReprojectError::DimensionMismatch {
                    expected: self.grid(),
                    actual: frame.grid,
                }
            );
            return;
        }
        self.engine.process(frame);
        self.publisher.mark(Channel::Depth);
        self.publisher.mark(Channel::Cloud);
    }

    fn on_color(&self, frame: &ColorFrame) {
        if frame.grid != self.grid() || frame.data.len() != self.grid().len() * 3 {
            error!(
                "{}",
                ReprojectError::DimensionMismatch {
                    expected: self.grid(),
                    actual: frame.grid,
                }
            );
            return;
        }
        self.color.write(|slot| {
            slot.data.copy_from_slice(&frame.data);
            slot.timestamp = frame.timestamp;
        });
        self.publisher.mark(Channel::Color);
    }
}
