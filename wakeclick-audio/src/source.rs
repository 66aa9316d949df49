//! Microphone frame source built on cpal
//!
//! The device callback runs on cpal's audio thread and only appends samples to
//! a shared buffer; [`MicrophoneSource::read`] blocks the caller until a full
//! frame is available.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample, Stream, StreamConfig};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::buffer::CircularBuffer;
use crate::error::{AudioError, Result};
use crate::resampler::{first_channel, Resampler};
use crate::AudioConfig;

/// Source of fixed-length mono audio frames.
///
/// `read` blocks until exactly `frame_length()` samples are available.
/// `release` frees the device and must be safe to call more than once.
pub trait FrameSource {
    fn frame_length(&self) -> usize;
    fn start(&mut self) -> Result<()>;
    fn read(&mut self) -> Result<Vec<f32>>;
    fn stop(&mut self) -> Result<()>;
    fn release(&mut self);
}

struct Shared {
    buffer: Mutex<CircularBuffer>,
    ready: Condvar,
    recording: AtomicBool,
}

/// Microphone input delivering frames at [`AudioConfig::sample_rate`].
///
/// Not `Send`: cpal streams must stay on the thread that created them, so
/// construct this inside the worker that reads from it.
pub struct MicrophoneSource {
    config: AudioConfig,
    shared: Arc<Shared>,
    stream: Option<Stream>,
}

impl MicrophoneSource {
    pub fn new(config: AudioConfig) -> Result<Self> {
        if config.frame_length == 0 {
            return Err(AudioError::invalid_config("frame_length must be positive"));
        }

        let capacity = ((config.buffer_duration * config.sample_rate as f32) as usize)
            .max(config.frame_length * 2);

        Ok(Self {
            config,
            shared: Arc::new(Shared {
                buffer: Mutex::new(CircularBuffer::new(capacity)),
                ready: Condvar::new(),
                recording: AtomicBool::new(false),
            }),
            stream: None,
        })
    }

    fn select_device(&self) -> Result<cpal::Device> {
        let host = cpal::default_host();
        match self.config.device_index {
            Some(index) => {
                debug!("Selecting input device index {}", index);
                host.input_devices()
                    .map_err(|e| AudioError::device(format!("Failed to enumerate devices: {}", e)))?
                    .nth(index)
                    .ok_or_else(|| AudioError::device(format!("Device index {} not found", index)))
            }
            None => host
                .default_input_device()
                .ok_or_else(|| AudioError::device("No default input device found")),
        }
    }

    fn build_stream<T>(
        &self,
        device: &cpal::Device,
        stream_config: &StreamConfig,
        mut resampler: Resampler,
    ) -> Result<Stream>
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        let shared = Arc::clone(&self.shared);
        let channels = stream_config.channels;
        let chunk_size = resampler.chunk_size();
        let mut pending: Vec<f32> = Vec::with_capacity(chunk_size * 2);

        device
            .build_input_stream(
                stream_config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    if !shared.recording.load(Ordering::Relaxed) {
                        return;
                    }

                    let samples: Vec<f32> = data.iter().map(|s| s.to_sample::<f32>()).collect();
                    pending.extend(first_channel(&samples, channels));

                    while pending.len() >= chunk_size {
                        let chunk: Vec<f32> = pending.drain(..chunk_size).collect();
                        match resampler.process(&chunk) {
                            Ok(out) => {
                                let dropped = shared.buffer.lock().write_overwriting(&out);
                                if dropped > 0 {
                                    debug!("Frame reader behind, dropped {} samples", dropped);
                                }
                                shared.ready.notify_one();
                            }
                            Err(e) => {
                                error!("Resampling error: {}", e);
                                return;
                            }
                        }
                    }
                },
                |err| {
                    error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::stream(format!("Failed to build stream: {}", e)))
    }
}

impl FrameSource for MicrophoneSource {
    fn frame_length(&self) -> usize {
        self.config.frame_length
    }

    fn start(&mut self) -> Result<()> {
        if self.shared.recording.load(Ordering::Relaxed) {
            warn!("Audio capture already running");
            return Ok(());
        }

        let device = self.select_device()?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let supported = device
            .default_input_config()
            .map_err(|e| AudioError::device(format!("Failed to get device config: {}", e)))?;
        let source_rate = supported.sample_rate().0;
        let stream_config: StreamConfig = supported.config();

        info!(
            "Audio input: {} ({} Hz, {} ch) → {} Hz mono, {} samples/frame",
            device_name,
            source_rate,
            stream_config.channels,
            self.config.sample_rate,
            self.config.frame_length
        );

        self.shared.buffer.lock().clear();

        let resampler = Resampler::new(source_rate, self.config.sample_rate)?;
        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => self.build_stream::<f32>(&device, &stream_config, resampler)?,
            cpal::SampleFormat::I16 => self.build_stream::<i16>(&device, &stream_config, resampler)?,
            cpal::SampleFormat::U16 => self.build_stream::<u16>(&device, &stream_config, resampler)?,
            cpal::SampleFormat::I32 => self.build_stream::<i32>(&device, &stream_config, resampler)?,
            other => {
                return Err(AudioError::device(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        };

        self.shared.recording.store(true, Ordering::Relaxed);
        stream
            .play()
            .map_err(|e| AudioError::stream(format!("Failed to start stream: {}", e)))?;
        self.stream = Some(stream);

        Ok(())
    }

    fn read(&mut self) -> Result<Vec<f32>> {
        let frame_length = self.config.frame_length;
        let stall_limit = Duration::from_secs_f32(self.config.stall_timeout);
        let waiting_since = Instant::now();

        let mut buffer = self.shared.buffer.lock();
        loop {
            if buffer.available() >= frame_length {
                let mut frame = vec![0.0f32; frame_length];
                buffer.read(&mut frame);
                return Ok(frame);
            }

            if !self.shared.recording.load(Ordering::Relaxed) {
                return Err(AudioError::NotRecording);
            }

            if waiting_since.elapsed() >= stall_limit {
                return Err(AudioError::Stalled(self.config.stall_timeout));
            }

            self.shared
                .ready
                .wait_for(&mut buffer, Duration::from_millis(200));
        }
    }

    fn stop(&mut self) -> Result<()> {
        if !self.shared.recording.swap(false, Ordering::Relaxed) {
            return Ok(());
        }

        if let Some(stream) = self.stream.as_ref() {
            stream
                .pause()
                .map_err(|e| AudioError::stream(format!("Failed to pause stream: {}", e)))?;
        }
        self.shared.ready.notify_all();
        info!("Audio capture stopped");
        Ok(())
    }

    fn release(&mut self) {
        self.shared.recording.store(false, Ordering::Relaxed);
        if self.stream.take().is_some() {
            debug!("Audio device released");
        }
        self.shared.buffer.lock().clear();
    }
}

impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        self.release();
    }
}
