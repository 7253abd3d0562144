pub mod calibration;
pub mod camera_model;
pub mod config;
pub mod distortion_map;
pub mod double_buffer;
pub mod error;
pub mod intrinsics;
pub mod io;
pub mod pipeline;
pub mod publish;
pub mod reproject;
pub mod session;
pub mod source;
pub mod types;
pub mod visualization;

pub use calibration::{CalibrationDict, LensCalibration, RemapTable};
pub use config::PipelineConfig;
pub use distortion_map::{DistortionMap, SharedDistortionMap};
pub use double_buffer::DoubleBuffer;
pub use error::{ReprojectError, Result};
pub use intrinsics::{DEPTH_SCALE, DepthIntrinsics};
pub use pipeline::DepthPipeline;
pub use publish::{Channel, FramePublisher, Output, OutputSink};
pub use reproject::{ReprojectionEngine, reproject_frame, reproject_into};
pub use session::CaptureSession;
pub use source::{DepthSource, FrameSink, SourceConfig, open_source};
pub use types::*;
