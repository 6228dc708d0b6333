//! The capture → extract half shared by enrollment, check-in and identify.

use crate::error::AttendanceError;
use roster_core::{DetectedFace, FaceExtractor, FrameSource};

/// Capture one frame and return the first face the extractor reports.
///
/// Multi-face frames are not disambiguated by size or confidence: the first
/// face in extractor scan order wins and the rest are dropped.
pub(crate) fn capture_first_face<S, X>(
    source: &mut S,
    extractor: &mut X,
) -> Result<DetectedFace, AttendanceError>
where
    S: FrameSource + ?Sized,
    X: FaceExtractor + ?Sized,
{
    tracing::debug!(stage = "capturing", "attempt stage");
    let frame = source.capture_frame()?;

    tracing::debug!(
        stage = "extracting",
        width = frame.width,
        height = frame.height,
        "attempt stage"
    );
    let faces = extractor.extract_faces(&frame)?;

    let count = faces.len();
    let face = faces
        .into_iter()
        .next()
        .ok_or(AttendanceError::NoFaceDetected)?;

    if count > 1 {
        tracing::warn!(count, "multiple faces in frame; using the first");
    }

    Ok(face)
}
