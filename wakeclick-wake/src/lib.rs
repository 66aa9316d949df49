//! Wake phrase detection for wakeclick
//!
//! Several keyword models are loaded into one engine. Each model's position in
//! [`WakeConfig::keyword_paths`] is the keyword index reported by
//! [`KeywordDetector::process`], so the order of that list is the contract with
//! whoever maps indices to actions.
//!
//! # Example
//!
//! ```no_run
//! use wakeclick_wake::{KeywordDetector, RustpotterDetector, WakeConfig};
//!
//! let config = WakeConfig::with_keywords(["models/call.rpw", "models/hangup.rpw"])
//!     .threshold(0.5);
//! let mut detector = RustpotterDetector::new(config)?;
//!
//! let frame = vec![0.0f32; detector.frame_length()];
//! if let Some(index) = detector.process(&frame)? {
//!     println!("keyword #{index} detected");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod rustpotter_engine;

use std::path::PathBuf;

pub use error::{Result, WakeError};
pub use rustpotter_engine::RustpotterDetector;

/// Per-frame keyword spotter.
///
/// Internally stateful, but from the caller's side a function of one frame:
/// `Some(index)` when a keyword completes in this frame, `None` otherwise.
pub trait KeywordDetector {
    /// Exact number of samples `process` accepts.
    fn frame_length(&self) -> usize;

    /// Number of keywords, i.e. valid indices are `0..keyword_count()`.
    fn keyword_count(&self) -> usize;

    fn process(&mut self, frame: &[f32]) -> Result<Option<usize>>;
}

/// Wake-word engine configuration
#[derive(Debug, Clone)]
pub struct WakeConfig {
    /// Keyword model files, in keyword-index order
    pub keyword_paths: Vec<PathBuf>,

    /// Detection score threshold (0.0 to 1.0, default: 0.5)
    pub threshold: f32,

    /// Minimum averaged score across frames (0.0 disables the check)
    pub avg_threshold: f32,

    /// Audio sample rate of incoming frames (default: 16000)
    pub sample_rate: u32,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            keyword_paths: Vec::new(),
            threshold: 0.5,
            avg_threshold: 0.0,
            sample_rate: 16000,
        }
    }
}

impl WakeConfig {
    /// Create config with keyword model paths
    pub fn with_keywords<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            keyword_paths: paths.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Set detection threshold
    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set averaged-score threshold
    pub fn avg_threshold(mut self, threshold: f32) -> Self {
        self.avg_threshold = threshold;
        self
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.keyword_paths.is_empty() {
            return Err(WakeError::config("At least one keyword model is required"));
        }

        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(WakeError::config("Threshold must be between 0.0 and 1.0"));
        }

        if !(0.0..=1.0).contains(&self.avg_threshold) {
            return Err(WakeError::config("avg_threshold must be between 0.0 and 1.0"));
        }

        if self.sample_rate == 0 {
            return Err(WakeError::config("Sample rate must be positive"));
        }

        Ok(())
    }

    /// Fail with the first keyword model that is missing on disk.
    fn check_models_exist(&self) -> Result<()> {
        match self.keyword_paths.iter().find(|p| !p.is_file()) {
            Some(missing) => Err(WakeError::MissingModel(missing.clone())),
            None => Ok(()),
        }
    }
}
