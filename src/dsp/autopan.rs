//! Autopan effect
//!
//! Sweeps the stereo balance with a slow sine LFO. The buffer is cut into
//! fixed-duration chunks; every chunk gets a single pan position taken at
//! its start time, so the sweep moves in small steps rather than per sample.

use std::f64::consts::PI;
use std::ops::Range;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::effect::Effect;
use crate::engine::{AudioBuffer, ChannelLayout};
use crate::error::{PanverbError, Result};

/// Default LFO rate in Hz (one full sweep every 12.5s)
pub const DEFAULT_FREQ_HZ: f32 = 0.08;

/// Default sweep depth
pub const DEFAULT_AMOUNT: f32 = 0.85;

/// Default chunk duration in milliseconds
pub const DEFAULT_CHUNK_MS: u32 = 50;

/// Progress is reported this many times per render, at most
const PROGRESS_STEPS: usize = 20;

// ============================================================================
// Parameters
// ============================================================================

/// Autopan parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopanParams {
    /// LFO rate in Hz
    pub freq_hz: f32,
    /// Sweep depth: 0 (no movement) to 1 (hard left to hard right)
    pub amount: f32,
    /// Chunk duration in milliseconds
    pub chunk_ms: u32,
}

impl Default for AutopanParams {
    fn default() -> Self {
        Self {
            freq_hz: DEFAULT_FREQ_HZ,
            amount: DEFAULT_AMOUNT,
            chunk_ms: DEFAULT_CHUNK_MS,
        }
    }
}

impl AutopanParams {
    /// Validate all parameters are within range
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.amount) {
            return Err(PanverbError::InvalidParameter {
                param: "amount".to_string(),
                value: self.amount,
                min: 0.0,
                max: 1.0,
            });
        }
        if !self.freq_hz.is_finite() || self.freq_hz < 0.0 {
            return Err(PanverbError::InvalidParameter {
                param: "freq_hz".to_string(),
                value: self.freq_hz,
                min: 0.0,
                max: f32::MAX,
            });
        }
        if self.chunk_ms == 0 {
            return Err(PanverbError::InvalidParameter {
                param: "chunk_ms".to_string(),
                value: 0.0,
                min: 1.0,
                max: u32::MAX as f32,
            });
        }
        Ok(())
    }
}

// ============================================================================
// Pan law and chunking
// ============================================================================

/// Pan position at `t_secs` from the start of the buffer
///
/// Always 0 (centered) at t = 0.
pub fn pan_position(params: &AutopanParams, t_secs: f64) -> f32 {
    (params.amount as f64 * (2.0 * PI * params.freq_hz as f64 * t_secs).sin()) as f32
}

/// Left/right gains for a pan position in [-1, 1]
///
/// The favoured side is boosted by up to +3 dB and the other side falls
/// off to silence at |pan| = 1. `pan_gains(0.0)` is exactly `(1.0, 1.0)`.
pub fn pan_gains(pan: f32) -> (f32, f32) {
    // +6 dB of boost at the extremes, halved to +3 dB on the favoured side
    let boost = 2.0_f32.powf(pan.abs().min(1.0));
    let favoured = boost.sqrt();
    let opposite = (2.0 - boost).max(0.0);

    if pan < 0.0 {
        (favoured, opposite)
    } else {
        (opposite, favoured)
    }
}

/// Split `len` frames into `chunk_ms` slices
///
/// Slice `k` is `[frame_at(k * chunk_ms), frame_at((k + 1) * chunk_ms))`,
/// computed from the millisecond grid rather than by adding a fixed frame
/// count, so rates where a chunk is a fractional number of frames don't
/// drift. The last slice may be shorter. At rates below one frame per chunk
/// some slices are empty; they keep their index so slice `k` always starts
/// at `k * chunk_ms`.
pub fn chunk_bounds(len: usize, sample_rate: u32, chunk_ms: u32) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    if sample_rate == 0 || chunk_ms == 0 {
        return vec![0..len];
    }

    let frame_at = |ms: u64| -> usize {
        let frame = ms.saturating_mul(sample_rate as u64) / 1000;
        (frame.min(len as u64)) as usize
    };

    let mut bounds = Vec::new();
    let mut ms = 0u64;
    loop {
        let start = frame_at(ms);
        if start >= len {
            break;
        }
        bounds.push(start..frame_at(ms + chunk_ms as u64));
        ms += chunk_ms as u64;
    }

    bounds
}

/// Start time of chunk `index`, in seconds
pub fn chunk_start_secs(index: usize, chunk_ms: u32) -> f64 {
    index as f64 * chunk_ms as f64 / 1000.0
}

fn progress_step(total_chunks: usize) -> usize {
    total_chunks.div_ceil(PROGRESS_STEPS).max(1)
}

// ============================================================================
// Autopan
// ============================================================================

/// Chunked sine autopan
#[derive(Debug, Clone, Default)]
pub struct Autopan {
    params: AutopanParams,
}

impl Autopan {
    pub fn new(params: AutopanParams) -> Self {
        Self { params }
    }

    /// Render a panned stereo copy of `input`
    ///
    /// `on_progress` receives the fraction of chunks done, in [0, 1), about
    /// every 5% of chunks. It is never called for an empty buffer.
    pub fn apply<F>(&self, input: &AudioBuffer, mut on_progress: F) -> Result<AudioBuffer>
    where
        F: FnMut(f32),
    {
        self.params.validate()?;

        let stereo = match input.channel_layout() {
            Some(_) => input.to_stereo(),
            None => {
                return Err(PanverbError::UnsupportedFormat {
                    format: format!(
                        "{}-channel audio (only mono/stereo supported)",
                        input.channels()
                    ),
                })
            }
        };

        let chunks = chunk_bounds(stereo.len(), stereo.sample_rate, self.params.chunk_ms);
        let total = chunks.len();
        let step = progress_step(total);

        debug!(
            "Autopan: {} frames in {} chunks (freq {} Hz, amount {})",
            stereo.len(),
            total,
            self.params.freq_hz,
            self.params.amount
        );

        let mut output = AudioBuffer {
            samples: vec![Vec::with_capacity(stereo.len()); ChannelLayout::Stereo.num_channels()],
            sample_rate: stereo.sample_rate,
        };

        for (i, frames) in chunks.into_iter().enumerate() {
            if i % step == 0 {
                on_progress(i as f32 / total as f32);
            }
            // Sub-kHz rates can yield empty slices; they carry no audio
            if frames.is_empty() {
                continue;
            }

            let start_secs = chunk_start_secs(i, self.params.chunk_ms);
            let pan = pan_position(&self.params, start_secs);
            let (left_gain, right_gain) = pan_gains(pan);
            trace!("chunk {} @ {:.3}s: pan {:+.3}", i, start_secs, pan);

            let mut piece = stereo.slice(frames);
            for sample in piece.channel_mut(0) {
                *sample *= left_gain;
            }
            for sample in piece.channel_mut(1) {
                *sample *= right_gain;
            }
            output.append(&piece)?;
        }

        Ok(output)
    }
}

impl Effect for Autopan {
    fn process(&mut self, buffer: &mut AudioBuffer) -> Result<()> {
        *buffer = self.apply(buffer, |_| {})?;
        Ok(())
    }

    fn prepare(&mut self, _sample_rate: u32) {
        // Chunk boundaries come from each buffer's own sample rate
    }

    fn reset(&mut self) {
        // Stateless between renders
    }

    fn effect_type(&self) -> &'static str {
        "autopan"
    }

    fn get_params(&self) -> serde_json::Value {
        serde_json::json!({
            "freq_hz": self.params.freq_hz,
            "amount": self.params.amount,
            "chunk_ms": self.params.chunk_ms,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
