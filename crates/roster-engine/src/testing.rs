//! In-process fakes for the capture and extraction collaborators.

use roster_core::{
    BoundingBox, CaptureError, DetectedFace, Embedding, ExtractError, FaceExtractor, FrameSource,
    PixelLayout, RawImage, RecognizeError, TextRecognizer,
};
use std::collections::VecDeque;

pub fn frame() -> RawImage {
    RawImage {
        data: vec![128; 4],
        width: 2,
        height: 2,
        layout: PixelLayout::Gray8,
    }
}

pub fn face(values: &[f64]) -> DetectedFace {
    DetectedFace {
        bbox: BoundingBox {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            confidence: None,
        },
        embedding: Embedding::new(values.to_vec()),
    }
}

/// Camera that yields a frame, or fails, and counts captures.
pub struct FakeCamera {
    pub fail: bool,
    pub captures: usize,
}

impl FakeCamera {
    pub fn working() -> Self {
        Self { fail: false, captures: 0 }
    }

    pub fn broken() -> Self {
        Self { fail: true, captures: 0 }
    }
}

impl FrameSource for FakeCamera {
    fn capture_frame(&mut self) -> Result<RawImage, CaptureError> {
        self.captures += 1;
        if self.fail {
            Err(CaptureError::NoFrame("lens cap on".into()))
        } else {
            Ok(frame())
        }
    }
}

/// Extractor that replays a queue of scripted results, one per call.
#[derive(Default)]
pub struct ScriptedExtractor {
    results: VecDeque<Vec<DetectedFace>>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a frame containing exactly these faces.
    pub fn then(mut self, faces: Vec<DetectedFace>) -> Self {
        self.results.push_back(faces);
        self
    }

    pub fn then_face(self, values: &[f64]) -> Self {
        self.then(vec![face(values)])
    }
}

impl FaceExtractor for ScriptedExtractor {
    fn extract_faces(&mut self, _image: &RawImage) -> Result<Vec<DetectedFace>, ExtractError> {
        self.results
            .pop_front()
            .ok_or_else(|| ExtractError::Failed {
                status: "exhausted".into(),
                stderr: "no scripted result left".into(),
            })
    }
}

pub struct FixedText(pub Result<String, String>);

impl TextRecognizer for FixedText {
    fn recognize_text(&mut self, _image: &RawImage) -> Result<String, RecognizeError> {
        self.0.clone().map_err(RecognizeError::Failed)
    }
}
