//! Audio Buffer Management
//!
//! Provides the core audio buffer type shared by every stage. Buffers keep
//! the sample rate of the file they were decoded from; nothing is resampled.

use std::ops::Range;

use crate::error::{PanverbError, Result};

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Calculate the RMS (Root Mean Square) level of an audio buffer in dB
///
/// Returns -f32::INFINITY for empty or silent buffers.
pub fn calculate_rms(buffer: &AudioBuffer) -> f32 {
    let total_samples = buffer.channels() * buffer.len();
    if total_samples == 0 {
        return f32::NEG_INFINITY;
    }

    let sum_squares: f64 = buffer
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| (s as f64) * (s as f64))
        .sum();

    let rms = (sum_squares / total_samples as f64).sqrt() as f32;
    linear_to_db(rms)
}

/// Calculate the peak level of an audio buffer in dB
///
/// Returns -f32::INFINITY for empty buffers.
pub fn calculate_peak(buffer: &AudioBuffer) -> f32 {
    let peak = buffer
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| s.abs())
        .fold(0.0_f32, f32::max);

    linear_to_db(peak)
}

// ============================================================================
// Channel Layout
// ============================================================================

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Single channel (mono)
    Mono,
    /// Two channels (stereo: left, right)
    #[default]
    Stereo,
}

impl ChannelLayout {
    /// Returns the number of channels for this layout
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// Create a ChannelLayout from a channel count
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Decoded audio, one `Vec<f32>` per channel
///
/// # Example
/// ```
/// use panverb::engine::buffer::{AudioBuffer, ChannelLayout};
///
/// // 1 second of mono silence at 44.1kHz
/// let buffer = AudioBuffer::new(44100, ChannelLayout::Mono, 44100);
/// assert_eq!(buffer.channels(), 1);
/// assert_eq!(buffer.len(), 44100);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a zeroed (silent) buffer
    pub fn new(num_samples: usize, layout: ChannelLayout, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_samples]; layout.num_channels()],
            sample_rate,
        }
    }

    /// Create an audio buffer from interleaved sample data
    ///
    /// Returns an error if the data length doesn't divide evenly into frames.
    pub fn from_interleaved(
        interleaved: &[f32],
        layout: ChannelLayout,
        sample_rate: u32,
    ) -> Result<Self> {
        let num_channels = layout.num_channels();

        if interleaved.len() % num_channels != 0 {
            return Err(PanverbError::InvalidAudio {
                reason: format!(
                    "Interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
                source: None,
            });
        }

        let num_samples = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_samples); num_channels];

        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Convert the buffer to interleaved format (L, R, L, R, ... for stereo)
    pub fn to_interleaved(&self) -> Vec<f32> {
        let num_channels = self.channels();
        let num_samples = self.len();

        let mut interleaved = Vec::with_capacity(num_channels * num_samples);
        for sample_idx in 0..num_samples {
            for channel in &self.samples {
                interleaved.push(channel[sample_idx]);
            }
        }

        interleaved
    }

    /// Get the number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Get the number of samples (frames) per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer is empty (no samples)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Get the channel layout
    pub fn channel_layout(&self) -> Option<ChannelLayout> {
        ChannelLayout::from_count(self.channels())
    }

    /// Get immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Get mutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.samples[index]
    }

    /// Return a stereo copy of this buffer
    ///
    /// Mono is duplicated to both sides; stereo is cloned unchanged.
    pub fn to_stereo(&self) -> Self {
        match self.channels() {
            1 => Self {
                samples: vec![self.samples[0].clone(), self.samples[0].clone()],
                sample_rate: self.sample_rate,
            },
            _ => self.clone(),
        }
    }

    /// Copy a frame range out of every channel
    ///
    /// The range is clamped to the buffer length.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let len = self.len();
        let start = range.start.min(len);
        let end = range.end.clamp(start, len);
        Self {
            samples: self
                .samples
                .iter()
                .map(|ch| ch[start..end].to_vec())
                .collect(),
            sample_rate: self.sample_rate,
        }
    }

    /// Append another buffer's frames to the end of this one
    pub fn append(&mut self, other: &AudioBuffer) -> Result<()> {
        if other.channels() != self.channels() {
            return Err(PanverbError::InvalidAudio {
                reason: format!(
                    "Cannot append {}-channel audio to {}-channel audio",
                    other.channels(),
                    self.channels()
                ),
                source: None,
            });
        }

        for (dst, src) in self.samples.iter_mut().zip(other.samples.iter()) {
            dst.extend_from_slice(src);
        }
        Ok(())
    }

    /// Check if all samples are finite (not NaN or Infinity)
    ///
    /// Used for DSP overflow detection.
    pub fn is_finite(&self) -> bool {
        self.samples
            .iter()
            .flat_map(|ch| ch.iter())
            .all(|s| s.is_finite())
    }
}

impl Default for AudioBuffer {
    fn default() -> Self {
        Self::new(0, ChannelLayout::Stereo, 44100)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_buffer(samples: Vec<Vec<f32>>) -> AudioBuffer {
        AudioBuffer {
            samples,
            sample_rate: 44100,
        }
    }

    #[test]
    fn test_db_to_linear() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        // -6 dB ~= 0.5 linear
        assert!((db_to_linear(-6.0206) - 0.5).abs() < 1e-4);
        assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_linear_to_db() {
        assert!((linear_to_db(1.0) - 0.0).abs() < 1e-6);
        assert!((linear_to_db(0.1) - (-20.0)).abs() < 1e-4);
        assert!(linear_to_db(0.0).is_infinite() && linear_to_db(0.0).is_sign_negative());
    }

    #[test]
    fn test_calculate_rms_silence() {
        let buffer = create_test_buffer(vec![vec![0.0; 1000]]);
        let rms = calculate_rms(&buffer);
        assert!(rms.is_infinite() && rms.is_sign_negative());
    }

    #[test]
    fn test_calculate_rms_unity() {
        let buffer = create_test_buffer(vec![vec![1.0; 1000]]);
        assert!(calculate_rms(&buffer).abs() < 0.01);
    }

    #[test]
    fn test_calculate_peak_negative() {
        let mut samples = vec![0.0; 1000];
        samples[500] = -0.5;
        let buffer = create_test_buffer(vec![samples]);
        // -0.5 linear = -6.02 dB
        assert!((calculate_peak(&buffer) - (-6.02)).abs() < 0.1);
    }

    #[test]
    fn test_channel_layout() {
        assert_eq!(ChannelLayout::Mono.num_channels(), 1);
        assert_eq!(ChannelLayout::Stereo.num_channels(), 2);
        assert_eq!(ChannelLayout::from_count(1), Some(ChannelLayout::Mono));
        assert_eq!(ChannelLayout::from_count(2), Some(ChannelLayout::Stereo));
        assert_eq!(ChannelLayout::from_count(6), None);
    }

    #[test]
    fn test_buffer_new() {
        let buffer = AudioBuffer::new(1000, ChannelLayout::Stereo, 48000);
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.len(), 1000);
        assert_eq!(buffer.sample_rate, 48000);
        assert!((buffer.duration_secs() - 1000.0 / 48000.0).abs() < 1e-9);
    }

    #[test]
    fn test_buffer_from_interleaved_stereo() {
        let interleaved = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let buffer =
            AudioBuffer::from_interleaved(&interleaved, ChannelLayout::Stereo, 44100).unwrap();

        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.channel(0), &[0.1, 0.3, 0.5]); // Left
        assert_eq!(buffer.channel(1), &[0.2, 0.4, 0.6]); // Right
        assert_eq!(buffer.to_interleaved(), interleaved);
    }

    #[test]
    fn test_buffer_from_interleaved_invalid() {
        // 5 samples can't be evenly split into stereo
        let result =
            AudioBuffer::from_interleaved(&[0.1, 0.2, 0.3, 0.4, 0.5], ChannelLayout::Stereo, 44100);
        assert!(result.is_err());
    }

    #[test]
    fn test_buffer_from_interleaved_empty() {
        let buffer = AudioBuffer::from_interleaved(&[], ChannelLayout::Mono, 44100).unwrap();
        assert_eq!(buffer.channels(), 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_to_stereo_duplicates_mono() {
        let mono = create_test_buffer(vec![vec![0.1, -0.2, 0.3]]);
        let stereo = mono.to_stereo();

        assert_eq!(stereo.channels(), 2);
        assert_eq!(stereo.channel(0), mono.channel(0));
        assert_eq!(stereo.channel(1), mono.channel(0));
    }

    #[test]
    fn test_to_stereo_keeps_stereo() {
        let stereo = create_test_buffer(vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
        assert_eq!(stereo.to_stereo(), stereo);
    }

    #[test]
    fn test_slice_clamps_to_length() {
        let buffer = create_test_buffer(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);

        let middle = buffer.slice(1..2);
        assert_eq!(middle.samples, vec![vec![2.0], vec![5.0]]);

        let tail = buffer.slice(2..10);
        assert_eq!(tail.samples, vec![vec![3.0], vec![6.0]]);

        let past_end = buffer.slice(5..9);
        assert!(past_end.is_empty());
        assert_eq!(past_end.channels(), 2);
    }

    #[test]
    fn test_append() {
        let mut buffer = create_test_buffer(vec![vec![1.0], vec![2.0]]);
        let other = create_test_buffer(vec![vec![3.0, 5.0], vec![4.0, 6.0]]);
        buffer.append(&other).unwrap();

        assert_eq!(buffer.samples, vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]]);
    }

    #[test]
    fn test_append_channel_mismatch() {
        let mut buffer = create_test_buffer(vec![vec![1.0], vec![2.0]]);
        let mono = create_test_buffer(vec![vec![3.0]]);
        assert!(buffer.append(&mono).is_err());
    }

    #[test]
    fn test_buffer_is_finite() {
        assert!(create_test_buffer(vec![vec![0.5; 100]]).is_finite());
        assert!(!create_test_buffer(vec![vec![f32::NAN; 100]]).is_finite());
        assert!(!create_test_buffer(vec![vec![f32::INFINITY; 100]]).is_finite());
    }
}
