use roster_core::{CaptureError, ExtractError, MatchError};
use roster_store::StoreError;
use thiserror::Error;

/// Every way an enrollment or check-in attempt can fail.
///
/// All variants are recoverable: the caller shows the message and may start
/// a new attempt. Nothing here is retried automatically.
#[derive(Error, Debug)]
pub enum AttendanceError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("could not capture a frame: {0}")]
    Capture(#[from] CaptureError),
    #[error("no face detected")]
    NoFaceDetected,
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("'{0}' is not enrolled")]
    UnknownIdentity(String),
    #[error("face does not match '{name}' (distance {distance:.3}, tolerance {tolerance:.3})")]
    FaceMismatch {
        name: String,
        distance: f64,
        tolerance: f64,
    },
    #[error("face extraction failed: {0}")]
    Extraction(#[from] ExtractError),
    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for AttendanceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmptyName => AttendanceError::EmptyName,
            StoreError::DimensionMismatch {
                expected, actual, ..
            } => AttendanceError::DimensionMismatch { expected, actual },
            other => AttendanceError::Storage(other),
        }
    }
}

impl From<MatchError> for AttendanceError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::DimensionMismatch { expected, actual } => {
                AttendanceError::DimensionMismatch { expected, actual }
            }
        }
    }
}
