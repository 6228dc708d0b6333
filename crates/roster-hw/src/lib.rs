//! roster-hw — Frame sources for the attendance core.
//!
//! Provides V4L2-based camera capture and still-image file sources, both
//! implementing [`roster_core::FrameSource`].

pub mod camera;
pub mod frame;
pub mod still;

pub use camera::{Camera, DeviceInfo, PixelFormat};
pub use still::{load_image, save_image, StillImage};
