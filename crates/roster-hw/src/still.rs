//! Still-image files as frame sources, and writing frames back to disk.

use roster_core::{CaptureError, FrameSource, PixelLayout, RawImage};
use std::path::{Path, PathBuf};

/// Decode an image file (any format the `image` crate reads) to RGB.
pub fn load_image(path: &Path) -> Result<RawImage, CaptureError> {
    let decoded = image::open(path)
        .map_err(|e| CaptureError::Unreadable(format!("{}: {e}", path.display())))?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(RawImage {
        data: rgb.into_raw(),
        width,
        height,
        layout: PixelLayout::Rgb8,
    })
}

/// Encode a frame to `path`; the format follows the file extension.
pub fn save_image(frame: &RawImage, path: &Path) -> Result<(), image::ImageError> {
    let invalid = || {
        image::ImageError::Parameter(image::error::ParameterError::from_kind(
            image::error::ParameterErrorKind::DimensionMismatch,
        ))
    };
    match frame.layout {
        PixelLayout::Gray8 => {
            image::GrayImage::from_raw(frame.width, frame.height, frame.data.clone())
                .ok_or_else(invalid)?
                .save(path)
        }
        PixelLayout::Rgb8 => {
            image::RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
                .ok_or_else(invalid)?
                .save(path)
        }
    }
}

/// Serves the same image file on every capture.
#[derive(Debug, Clone)]
pub struct StillImage {
    path: PathBuf,
}

impl StillImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FrameSource for StillImage {
    fn capture_frame(&mut self) -> Result<RawImage, CaptureError> {
        load_image(&self.path)
    }
}
