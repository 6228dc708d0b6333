//! V4L2 camera capture via the `v4l` crate.
//!
//! The device is opened for one capture and closed again before
//! `capture_frame` returns, on success and on every error path.

use crate::frame;
use roster_core::{CaptureError, FrameSource, PixelLayout, RawImage};
use std::path::Path;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

const CAPTURE_WIDTH: u32 = 640;
const CAPTURE_HEIGHT: u32 = 480;
const STREAM_BUFFERS: u32 = 4;
/// Extra reads allowed while skipping dark frames after warmup.
const DARK_RETRIES: usize = 3;
const DARK_THRESHOLD: f32 = 0.95;

/// Info about a discovered V4L2 device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

/// Negotiated pixel format for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUYV 4:2:2 packed (2 bytes/pixel, extract Y channel).
    Yuyv,
    /// 8-bit grayscale (1 byte/pixel).
    Grey,
    /// 16-bit little-endian grayscale (2 bytes/pixel).
    Y16,
}

impl PixelFormat {
    fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        if fourcc == FourCC::new(b"YUYV") {
            Some(PixelFormat::Yuyv)
        } else if fourcc == FourCC::new(b"GREY") {
            Some(PixelFormat::Grey)
        } else if fourcc == FourCC::new(b"Y16 ") || fourcc == FourCC::new(b"Y16\0") {
            Some(PixelFormat::Y16)
        } else {
            None
        }
    }

    /// Reduce one driver buffer in this format to 8-bit grayscale.
    pub fn to_grayscale(
        self,
        buf: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, frame::FrameError> {
        match self {
            PixelFormat::Yuyv => frame::yuyv_to_grayscale(buf, width, height),
            PixelFormat::Grey => frame::grey_to_grayscale(buf, width, height),
            PixelFormat::Y16 => frame::y16_to_grayscale(buf, width, height),
        }
    }
}

/// A V4L2 camera addressed by path, acquired per capture.
#[derive(Debug, Clone)]
pub struct Camera {
    device_path: String,
    /// Frames to discard after opening, for auto-exposure to settle.
    warmup_frames: usize,
}

impl Camera {
    pub fn new(device_path: impl Into<String>, warmup_frames: usize) -> Self {
        Self {
            device_path: device_path.into(),
            warmup_frames,
        }
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    fn open_device(&self) -> Result<Device, CaptureError> {
        if !Path::new(&self.device_path).exists() {
            return Err(CaptureError::DeviceNotFound(self.device_path.clone()));
        }

        Device::with_path(&self.device_path).map_err(|e| {
            if e.to_string().contains("busy") || e.to_string().contains("EBUSY") {
                CaptureError::DeviceBusy
            } else {
                CaptureError::DeviceNotFound(format!("{}: {e}", self.device_path))
            }
        })
    }

    fn negotiate(&self, device: &Device) -> Result<(u32, u32, PixelFormat), CaptureError> {
        let caps = device
            .query_caps()
            .map_err(|e| CaptureError::NoFrame(format!("failed to query capabilities: {e}")))?;
        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CaptureError::NoFrame(format!(
                "{} is not a video capture device",
                self.device_path
            )));
        }

        let mut fmt = device
            .format()
            .map_err(|e| CaptureError::NoFrame(format!("failed to get format: {e}")))?;
        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = CAPTURE_WIDTH;
        fmt.height = CAPTURE_HEIGHT;

        let negotiated = device
            .set_format(&fmt)
            .map_err(|e| CaptureError::NoFrame(format!("failed to set format: {e}")))?;

        let pixel_format = PixelFormat::from_fourcc(negotiated.fourcc).ok_or_else(|| {
            CaptureError::NoFrame(format!(
                "unsupported pixel format: {:?} (need YUYV, GREY, or Y16)",
                negotiated.fourcc
            ))
        })?;

        tracing::debug!(
            device = %self.device_path,
            card = %caps.card,
            width = negotiated.width,
            height = negotiated.height,
            fourcc = ?negotiated.fourcc,
            "negotiated format"
        );

        Ok((negotiated.width, negotiated.height, pixel_format))
    }

    /// List available V4L2 video capture devices.
    pub fn list_devices() -> Vec<DeviceInfo> {
        let mut devices = Vec::new();

        for i in 0..16 {
            let path = format!("/dev/video{i}");
            if !Path::new(&path).exists() {
                continue;
            }
            let Ok(dev) = Device::with_path(&path) else {
                continue;
            };
            let Ok(caps) = dev.query_caps() else {
                continue;
            };
            if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
                continue;
            }
            devices.push(DeviceInfo {
                path,
                name: caps.card.clone(),
                driver: caps.driver.clone(),
                bus: caps.bus.clone(),
            });
        }

        devices
    }
}

impl FrameSource for Camera {
    fn capture_frame(&mut self) -> Result<RawImage, CaptureError> {
        let device = self.open_device()?;
        let (width, height, pixel_format) = self.negotiate(&device)?;

        let mut stream = MmapStream::with_buffers(&device, BufType::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| CaptureError::NoFrame(format!("failed to create mmap stream: {e}")))?;

        let mut last = None;
        for attempt in 0..self.warmup_frames + DARK_RETRIES {
            let (buf, meta) = stream
                .next()
                .map_err(|e| CaptureError::NoFrame(format!("failed to dequeue buffer: {e}")))?;

            if attempt < self.warmup_frames {
                continue;
            }

            let gray = pixel_format
                .to_grayscale(buf, width, height)
                .map_err(|e| CaptureError::NoFrame(e.to_string()))?;

            if !frame::is_dark_frame(&gray, DARK_THRESHOLD) {
                return Ok(RawImage {
                    data: gray,
                    width,
                    height,
                    layout: PixelLayout::Gray8,
                });
            }
            tracing::debug!(seq = meta.sequence, "skipping dark frame");
            last = Some(gray);
        }

        // Only dark frames: hand the last one on and let the extractor decide.
        match last {
            Some(gray) => {
                tracing::warn!(device = %self.device_path, "camera delivered only dark frames");
                Ok(RawImage {
                    data: gray,
                    width,
                    height,
                    layout: PixelLayout::Gray8,
                })
            }
            None => Err(CaptureError::NoFrame("camera produced no frames".into())),
        }
    }
}
