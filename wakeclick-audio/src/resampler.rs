//! Mono resampling with rubato
//!
//! Microphones commonly run at 44.1 or 48 kHz; wake-word models want 16 kHz.

use rubato::{
    Resampler as RubatoResampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};

use crate::error::{AudioError, Result};

/// Fixed-chunk mono resampler.
///
/// Input must be fed in chunks of exactly [`Resampler::chunk_size`] samples;
/// the capture callback accumulates device audio until a chunk is ready.
pub struct Resampler {
    inner: Option<SincFixedIn<f32>>,
    chunk_size: usize,
}

impl Resampler {
    /// Create a resampler from `source_rate` to `target_rate`, processing
    /// 100 ms of source audio per call.
    pub fn new(source_rate: u32, target_rate: u32) -> Result<Self> {
        if source_rate == 0 || target_rate == 0 {
            return Err(AudioError::invalid_config("Sample rate cannot be zero"));
        }

        let chunk_size = (source_rate as usize / 10).max(1);

        if source_rate == target_rate {
            return Ok(Self { inner: None, chunk_size });
        }

        let params = SincInterpolationParameters {
            sinc_len: 128,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 128,
            window: WindowFunction::BlackmanHarris2,
        };

        let inner = SincFixedIn::<f32>::new(
            target_rate as f64 / source_rate as f64,
            2.0,
            params,
            chunk_size,
            1,
        )
        .map_err(|e| AudioError::ResampleError(format!("Failed to create resampler: {:?}", e)))?;

        Ok(Self {
            inner: Some(inner),
            chunk_size,
        })
    }

    /// Number of source samples consumed per [`Resampler::process`] call.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Whether any rate conversion happens at all.
    pub fn is_passthrough(&self) -> bool {
        self.inner.is_none()
    }

    /// Resample one chunk of mono audio.
    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let Some(inner) = self.inner.as_mut() else {
            return Ok(input.to_vec());
        };

        if input.len() != self.chunk_size {
            return Err(AudioError::ResampleError(format!(
                "Expected {} samples, got {}",
                self.chunk_size,
                input.len()
            )));
        }

        let mut planar = inner
            .process(&[input], None)
            .map_err(|e| AudioError::ResampleError(format!("Resampling failed: {:?}", e)))?;

        Ok(planar.swap_remove(0))
    }
}

/// Collapse interleaved multi-channel audio to mono by taking the first
/// channel.
pub fn first_channel(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels as usize)
        .map(|frame| frame[0])
        .collect()
}
