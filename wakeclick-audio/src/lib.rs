//! wakeclick audio input
//!
//! Delivers fixed-length 16 kHz mono frames to the wake-word detector.
//!
//! ## Architecture
//!
//! ```text
//! Audio Device (cpal callback thread)
//!   │
//!   ├─> first channel only
//!   ├─> Resampler (rubato) -> 16kHz
//!   └─> CircularBuffer (ringbuf, drops oldest on overflow)
//!             │
//!             └─> MicrophoneSource::read() blocks until one frame is ready
//! ```

pub mod buffer;
pub mod error;
pub mod resampler;
pub mod source;

pub use buffer::CircularBuffer;
pub use error::{AudioError, Result};
pub use resampler::Resampler;
pub use source::{FrameSource, MicrophoneSource};

/// Audio sample rate expected by wake-word models
pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Audio configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Target sample rate (default: 16000 Hz)
    pub sample_rate: u32,
    /// Samples per frame handed to the detector
    pub frame_length: usize,
    /// How much audio to retain while the reader is busy (seconds)
    pub buffer_duration: f32,
    /// Device index (None = default device)
    pub device_index: Option<usize>,
    /// `read` fails if no audio arrives for this long (seconds)
    pub stall_timeout: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: TARGET_SAMPLE_RATE,
            frame_length: 480,
            buffer_duration: 2.0,
            device_index: None,
            stall_timeout: 5.0,
        }
    }
}
