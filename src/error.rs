use thiserror::Error;

use crate::types::GridSize;

/// Errors surfaced to the host by configuration and capture operations.
///
/// Per-pixel reprojection never fails; buffer size mismatches inside
/// [`crate::reproject::reproject_into`] are contract violations and panic.
#[derive(Debug, Error)]
pub enum ReprojectError {
    #[error("invalid grid dimension {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: GridSize, actual: GridSize },
    #[error("shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("type mismatch: expected {expected} cells, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("remap cell {index} points outside the grid ({x}, {y})")]
    CoordinateOutOfRange { index: usize, x: f32, y: f32 },
    #[error("missing buffer: {0}")]
    MissingBuffer(&'static str),
    #[error("malformed frame file: {0}")]
    MalformedFrame(String),
    #[error("capture session is already running")]
    AlreadyRunning,
    #[error("capture session is not running")]
    NotRunning,
    #[error("capture source was lost with its capture thread")]
    SourceLost,
    #[error("failed to spawn capture thread: {0}")]
    ThreadSpawn(std::io::Error),
    #[error("depth source {0} has no more frames")]
    SourceExhausted(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

pub type Result<T> = std::result::Result<T, ReprojectError>;
