//! roster-core — Data model and matching policy for face-verified attendance.
//!
//! Embeddings come from an external extractor; this crate only compares them
//! and defines the shapes that the store, the services and the collaborators
//! exchange.

pub mod collab;
pub mod matcher;
pub mod types;

pub use collab::{CaptureError, ExtractError, FaceExtractor, FrameSource, RecognizeError, TextRecognizer};
pub use matcher::{
    distance, is_match, is_valid_tolerance, parse_tolerance, FirstMatcher, MatchError, MatchPolicy,
    MatchResult, Matcher, NearestMatcher, DEFAULT_TOLERANCE,
};
pub use types::{
    is_blank, BoundingBox, CheckInEvent, DetectedFace, Embedding, Identity, PixelLayout, RawImage,
    TIMESTAMP_FORMAT,
};
