//! Error types for capture and matching

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VisionError>;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Failed to decode template {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Template {} has no contrast and cannot be matched", .0.display())]
    FlatTemplate(PathBuf),

    #[error("Screen capture failed: {0}")]
    Capture(String),

    #[error("Empty capture region {0}x{1}")]
    EmptyRegion(u32, u32),

    #[error("Failed to save image {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl VisionError {
    pub fn capture<S: Into<String>>(msg: S) -> Self {
        Self::Capture(msg.into())
    }
}
