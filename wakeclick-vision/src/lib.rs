//! wakeclick screen vision
//!
//! Captures a window's screen region and locates button templates in it
//! using zero-mean normalized cross-correlation.

pub mod error;
pub mod geometry;
pub mod grabber;
pub mod matcher;
pub mod ncc;

pub use error::{Result, VisionError};
pub use geometry::{BoundingBox, Point, Rect};
#[cfg(windows)]
pub use grabber::GdiGrabber;
pub use grabber::{capture_to_file, CaptureTool, ScreenGrabber, ToolGrabber};
pub use image::RgbaImage;
pub use matcher::{
    load_template, locate_in_image, ImageMatch, ScreenMatcher, TemplateMatcher,
    DEFAULT_CONFIDENCE,
};
