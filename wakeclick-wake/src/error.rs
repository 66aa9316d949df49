//! Error types for wake-word detection

use std::path::PathBuf;
use thiserror::Error;

/// Result type for wake-word operations
pub type Result<T> = std::result::Result<T, WakeError>;

/// Wake-word error types
#[derive(Error, Debug)]
pub enum WakeError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A keyword model file listed in the configuration does not exist
    #[error("Keyword model not found: {}", .0.display())]
    MissingModel(PathBuf),

    /// Engine failed to load
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// Frame did not have the length the engine expects
    #[error("Expected a frame of {expected} samples, got {actual}")]
    FrameLength { expected: usize, actual: usize },

    /// Engine reported a keyword it was never given
    #[error("Unknown keyword reported by engine: {0}")]
    UnknownKeyword(String),
}

impl WakeError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    pub fn initialization<S: Into<String>>(msg: S) -> Self {
        Self::Initialization(msg.into())
    }
}
