//! Circular buffer for audio samples

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;

/// Fixed-capacity sample buffer between the device callback and the frame
/// reader.
///
/// When the reader falls behind (for example while a click is being
/// dispatched) the oldest samples are discarded so the next frame handed out
/// is always recent audio.
pub struct CircularBuffer {
    producer: ringbuf::HeapProd<f32>,
    consumer: ringbuf::HeapCons<f32>,
    capacity: usize,
}

impl CircularBuffer {
    /// Create new circular buffer with given capacity
    ///
    /// ```
    /// use wakeclick_audio::CircularBuffer;
    ///
    /// let buffer = CircularBuffer::new(16000); // 1 second @ 16kHz
    /// assert_eq!(buffer.capacity(), 16000);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let rb = HeapRb::<f32>::new(capacity);
        let (producer, consumer) = rb.split();

        Self {
            producer,
            consumer,
            capacity,
        }
    }

    /// Write samples, dropping the oldest buffered samples to make room.
    ///
    /// Returns how many old samples were discarded.
    pub fn write_overwriting(&mut self, samples: &[f32]) -> usize {
        // Only the newest `capacity` samples of an oversized write can survive.
        let samples = if samples.len() > self.capacity {
            &samples[samples.len() - self.capacity..]
        } else {
            samples
        };

        let vacant = self.producer.vacant_len();
        let dropped = samples.len().saturating_sub(vacant);
        if dropped > 0 {
            self.consumer.skip(dropped);
        }
        self.producer.push_slice(samples);
        dropped
    }

    /// Read samples from the buffer. Returns number of samples actually read.
    pub fn read(&mut self, output: &mut [f32]) -> usize {
        self.consumer.pop_slice(output)
    }

    /// Get number of samples currently available for reading
    pub fn available(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Get total buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clear all data from buffer
    pub fn clear(&mut self) {
        self.consumer.clear();
    }
}
