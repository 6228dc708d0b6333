//! Interfaces to the collaborators the attendance core depends on but does
//! not implement: frame capture, face embedding extraction, handwriting OCR.

use crate::types::{DetectedFace, RawImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("capture device not found: {0}")]
    DeviceNotFound(String),
    #[error("capture device busy")]
    DeviceBusy,
    #[error("no frame obtained: {0}")]
    NoFrame(String),
    #[error("image file unreadable: {0}")]
    Unreadable(String),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("extractor not configured")]
    NotConfigured,
    #[error("extractor failed to run: {0}")]
    Spawn(String),
    #[error("extractor exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("extractor produced malformed output: {0}")]
    MalformedOutput(String),
    #[error("image encoding failed: {0}")]
    Encode(String),
}

#[derive(Error, Debug)]
pub enum RecognizeError {
    #[error("text recognizer not configured")]
    NotConfigured,
    #[error("text recognizer failed: {0}")]
    Failed(String),
}

/// Yields one still frame per call.
///
/// Implementations acquire the underlying device for the duration of the
/// call only, and release it on every exit path.
pub trait FrameSource {
    fn capture_frame(&mut self) -> Result<RawImage, CaptureError>;
}

/// Finds faces in an image and computes one embedding per face.
///
/// Faces are returned in the extractor's scan order. An image with no face
/// yields an empty vector, not an error.
pub trait FaceExtractor {
    fn extract_faces(&mut self, image: &RawImage) -> Result<Vec<DetectedFace>, ExtractError>;
}

/// Reads handwritten or printed text from an image.
pub trait TextRecognizer {
    fn recognize_text(&mut self, image: &RawImage) -> Result<String, RecognizeError>;
}

impl<T: FrameSource + ?Sized> FrameSource for &mut T {
    fn capture_frame(&mut self) -> Result<RawImage, CaptureError> {
        (**self).capture_frame()
    }
}

impl<T: FaceExtractor + ?Sized> FaceExtractor for &mut T {
    fn extract_faces(&mut self, image: &RawImage) -> Result<Vec<DetectedFace>, ExtractError> {
        (**self).extract_faces(image)
    }
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for &mut T {
    fn recognize_text(&mut self, image: &RawImage) -> Result<String, RecognizeError> {
        (**self).recognize_text(image)
    }
}
