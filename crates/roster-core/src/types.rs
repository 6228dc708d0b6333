use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Bounding box of a detected face, in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Face embedding vector (128-dimensional for the default extractor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f64>,
}

impl Embedding {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

impl From<Vec<f64>> for Embedding {
    fn from(values: Vec<f64>) -> Self {
        Self { values }
    }
}

/// One face reported by the extractor: where it is and what it looks like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    pub embedding: Embedding,
}

/// Pixel layout of a [`RawImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelLayout {
    /// 8-bit grayscale, 1 byte/pixel.
    Gray8,
    /// 8-bit RGB, 3 bytes/pixel, row-major.
    Rgb8,
}

impl PixelLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Gray8 => 1,
            PixelLayout::Rgb8 => 3,
        }
    }
}

/// A single still frame as handed from a frame source to the extractor.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
}

impl RawImage {
    /// Expected buffer length for the declared dimensions and layout.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.layout.bytes_per_pixel()
    }

    /// True if the buffer length agrees with width × height × layout.
    pub fn is_well_formed(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() == self.expected_len()
    }
}

/// An enrolled person: one name, one embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub embedding: Embedding,
}

/// A recorded attendance event.
///
/// `identity` is a name reference only; the identity may be removed from the
/// embedding store later without touching ledger rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInEvent {
    /// Ledger row id, assigned on append.
    pub id: i64,
    pub identity: String,
    /// Local wall-clock capture time, second precision.
    pub timestamp: NaiveDateTime,
    pub location: String,
}

/// Wire format for timestamps in the ledger: `YYYY-MM-DD HH:MM:SS`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Returns true if `name` is empty or whitespace only.
pub fn is_blank(name: &str) -> bool {
    name.trim().is_empty()
}
