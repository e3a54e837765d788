//! Reverb effect and the file-to-file reverb stage
//!
//! Implements the Freeverb algorithm:
//! - 8 parallel comb filters for early reflections
//! - 4 series allpass filters for diffusion
//! - Stereo width control
//! - Pre-delay buffer
//!
//! The render chain always runs it with [`ReverbParams::fixed`].

use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::effect::Effect;
use crate::engine::buffer::{calculate_peak, calculate_rms, db_to_linear};
use crate::engine::io::{export_audio, import_audio, ExportFormat, OutputFormat};
use crate::engine::AudioBuffer;
use crate::error::{PanverbError, Result};

// ============================================================================
// Freeverb Constants
// ============================================================================

/// Reference sample rate for Freeverb delays
const REFERENCE_SAMPLE_RATE: f64 = 44100.0;

/// Comb filter delays at 44100 Hz (8 filters)
const COMB_DELAYS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];

/// Allpass filter delays at 44100 Hz (4 filters)
const ALLPASS_DELAYS: [usize; 4] = [556, 441, 341, 225];

/// Stereo spread offset in samples (for right channel)
const STEREO_SPREAD: usize = 23;

/// Fixed gain for allpass filters (standard Freeverb value)
const ALLPASS_GAIN: f32 = 0.5;

/// Input attenuation before the comb bank
const FIXED_GAIN: f32 = 0.015;

/// Wet output scale
const WET_SCALE: f32 = 3.0;

/// Scale factor for room size parameter to feedback
const ROOM_SCALE: f32 = 0.28;

/// Offset for room size parameter to feedback
const ROOM_OFFSET: f32 = 0.7;

/// Scale factor for damping parameter
const DAMP_SCALE: f32 = 0.4;

/// Smallest delay-length factor allowed by `room_scale`
const MIN_ROOM_SCALE: f64 = 0.1;

/// Maximum pre-delay time in milliseconds
const MAX_PRE_DELAY_MS: f32 = 200.0;

// ============================================================================
// Parameter Structs
// ============================================================================

/// Reverb effect parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverbParams {
    /// Reverberance (decay length): 0 to 1
    pub room_size: f32,
    /// High-frequency damping: 0 (bright) to 1 (dark)
    pub damping: f32,
    /// Simulated room scale, stretches delay lengths: 0 to 1
    pub room_scale: f32,
    /// Stereo depth: 0 (mono) to 1 (full stereo)
    pub width: f32,
    /// Pre-delay in milliseconds
    pub pre_delay_ms: f32,
    /// Wet signal gain in dB, mixed on top of the unchanged dry signal
    pub wet_gain_db: f32,
}

impl ReverbParams {
    /// The parameter set used by the render chain
    ///
    /// 50% reverberance, 50% HF damping, 100% room scale, 100% stereo depth,
    /// no pre-delay, 0 dB wet gain, dry signal kept.
    pub fn fixed() -> Self {
        Self {
            room_size: 0.5,
            damping: 0.5,
            room_scale: 1.0,
            width: 1.0,
            pre_delay_ms: 0.0,
            wet_gain_db: 0.0,
        }
    }

    /// Validate all parameters are within range
    pub fn validate(&self) -> Result<()> {
        let unit_ranged = [
            ("room_size", self.room_size),
            ("damping", self.damping),
            ("room_scale", self.room_scale),
            ("width", self.width),
        ];
        for (param, value) in unit_ranged {
            check_range(param, value, 0.0, 1.0)?;
        }
        check_range("pre_delay_ms", self.pre_delay_ms, 0.0, MAX_PRE_DELAY_MS)?;
        check_range("wet_gain_db", self.wet_gain_db, -60.0, 10.0)?;
        Ok(())
    }
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self::fixed()
    }
}

fn check_range(param: &str, value: f32, min: f32, max: f32) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(PanverbError::InvalidParameter {
            param: param.to_string(),
            value,
            min,
            max,
        })
    }
}

// ============================================================================
// Filter Components
// ============================================================================

/// Low-pass comb filter for Freeverb
#[derive(Debug, Clone)]
struct CombFilter {
    /// Circular buffer for delay line
    buffer: Vec<f32>,
    write_pos: usize,
    /// Buffer size mask for efficient wrapping
    mask: usize,
    /// One-pole low-pass state in the feedback path
    filter_state: f32,
    feedback: f32,
    damp1: f32,
    damp2: f32,
}

impl CombFilter {
    /// Create a comb filter able to hold `delay_size` samples of delay
    fn new(delay_size: usize) -> Self {
        let size = (delay_size + 1).next_power_of_two();
        Self {
            buffer: vec![0.0; size],
            write_pos: 0,
            mask: size - 1,
            filter_state: 0.0,
            feedback: 0.5,
            damp1: 0.5,
            damp2: 0.5,
        }
    }

    fn set_coefficients(&mut self, feedback: f32, damp1: f32, damp2: f32) {
        self.feedback = feedback;
        self.damp1 = damp1;
        self.damp2 = damp2;
    }

    fn process(&mut self, input: f32, delay: usize) -> f32 {
        let read_pos = (self.write_pos + self.mask + 1 - delay) & self.mask;
        let output = self.buffer[read_pos];

        self.filter_state = output * self.damp1 + self.filter_state * self.damp2;
        self.buffer[self.write_pos] = input + self.filter_state * self.feedback;
        self.write_pos = (self.write_pos + 1) & self.mask;

        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
        self.write_pos = 0;
    }
}

/// Allpass filter for Freeverb diffusion
#[derive(Debug, Clone)]
struct AllpassFilter {
    buffer: Vec<f32>,
    write_pos: usize,
    mask: usize,
}

impl AllpassFilter {
    fn new(delay_size: usize) -> Self {
        let size = (delay_size + 1).next_power_of_two();
        Self {
            buffer: vec![0.0; size],
            write_pos: 0,
            mask: size - 1,
        }
    }

    fn process(&mut self, input: f32, delay: usize) -> f32 {
        let read_pos = (self.write_pos + self.mask + 1 - delay) & self.mask;
        let delayed = self.buffer[read_pos];

        let output = delayed - ALLPASS_GAIN * input;
        self.buffer[self.write_pos] = input + ALLPASS_GAIN * output;
        self.write_pos = (self.write_pos + 1) & self.mask;

        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// Pre-delay buffer for reverb
#[derive(Debug, Clone)]
struct PreDelayBuffer {
    buffer: Vec<f32>,
    write_pos: usize,
    mask: usize,
}

impl PreDelayBuffer {
    fn new(max_size: usize) -> Self {
        let size = (max_size + 1).next_power_of_two();
        Self {
            buffer: vec![0.0; size],
            write_pos: 0,
            mask: size - 1,
        }
    }

    /// Write a sample and read at the given delay (0 passes through)
    fn process(&mut self, input: f32, delay_samples: usize) -> f32 {
        self.buffer[self.write_pos] = input;
        let read_pos = (self.write_pos + self.mask + 1 - delay_samples) & self.mask;
        let output = self.buffer[read_pos];
        self.write_pos = (self.write_pos + 1) & self.mask;
        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// One channel's comb bank, allpass chain and pre-delay
#[derive(Debug, Clone)]
struct ReverbChannel {
    combs: Vec<CombFilter>,
    comb_delays: Vec<usize>,
    allpasses: Vec<AllpassFilter>,
    allpass_delays: Vec<usize>,
    pre_delay: PreDelayBuffer,
}

impl ReverbChannel {
    /// Build filters for the given delay scale; `spread` offsets the right channel
    fn new(scale: f64, spread: usize, max_pre_delay: usize) -> Self {
        let scaled = |base: usize| (((base + spread) as f64 * scale) as usize).max(1);

        let comb_delays: Vec<usize> = COMB_DELAYS.iter().map(|&d| scaled(d)).collect();
        let allpass_delays: Vec<usize> = ALLPASS_DELAYS.iter().map(|&d| scaled(d)).collect();

        Self {
            combs: comb_delays.iter().map(|&d| CombFilter::new(d)).collect(),
            allpasses: allpass_delays.iter().map(|&d| AllpassFilter::new(d)).collect(),
            comb_delays,
            allpass_delays,
            pre_delay: PreDelayBuffer::new(max_pre_delay),
        }
    }

    fn set_coefficients(&mut self, feedback: f32, damp1: f32, damp2: f32) {
        for comb in &mut self.combs {
            comb.set_coefficients(feedback, damp1, damp2);
        }
    }

    /// Run one (already attenuated) input sample through the tank
    fn process(&mut self, input: f32, pre_delay_samples: usize) -> f32 {
        let delayed = self.pre_delay.process(input, pre_delay_samples);

        // Parallel combs
        let mut output: f32 = self
            .combs
            .iter_mut()
            .zip(&self.comb_delays)
            .map(|(comb, &delay)| comb.process(delayed, delay))
            .sum();

        // Series allpasses
        for (allpass, &delay) in self.allpasses.iter_mut().zip(&self.allpass_delays) {
            output = allpass.process(output, delay);
        }

        output
    }

    fn clear(&mut self) {
        self.combs.iter_mut().for_each(CombFilter::clear);
        self.allpasses.iter_mut().for_each(AllpassFilter::clear);
        self.pre_delay.clear();
    }
}

// ============================================================================
// Main Reverb Effect
// ============================================================================

/// Reverb effect using the Freeverb algorithm
#[derive(Debug, Clone)]
pub struct Reverb {
    params: ReverbParams,
    sample_rate: u32,
    left: ReverbChannel,
    right: ReverbChannel,
    pre_delay_samples: usize,
}

impl Reverb {
    /// Create a new Reverb effect prepared for 44.1kHz
    pub fn new(params: ReverbParams) -> Self {
        let mut reverb = Self {
            left: ReverbChannel::new(1.0, 0, 1),
            right: ReverbChannel::new(1.0, STEREO_SPREAD, 1),
            params,
            sample_rate: REFERENCE_SAMPLE_RATE as u32,
            pre_delay_samples: 0,
        };
        reverb.prepare(REFERENCE_SAMPLE_RATE as u32);
        reverb
    }

    fn update_coefficients(&mut self) {
        let feedback = self.params.room_size * ROOM_SCALE + ROOM_OFFSET;
        let damp1 = 1.0 - self.params.damping * DAMP_SCALE;
        let damp2 = self.params.damping * DAMP_SCALE;

        self.left.set_coefficients(feedback, damp1, damp2);
        self.right.set_coefficients(feedback, damp1, damp2);
    }

    fn wet_gain(&self) -> f32 {
        WET_SCALE * db_to_linear(self.params.wet_gain_db)
    }

    fn process_mono(&mut self, buffer: &mut AudioBuffer) {
        let wet = self.wet_gain();
        let pre_delay = self.pre_delay_samples;

        for sample in buffer.channel_mut(0) {
            let input = *sample;
            let out = self.left.process(input * FIXED_GAIN, pre_delay);
            *sample = input + out * wet;
        }
    }

    fn process_stereo(&mut self, buffer: &mut AudioBuffer) {
        let wet = self.wet_gain();
        let width = self.params.width;
        let pre_delay = self.pre_delay_samples;

        // wet1 feeds the same side, wet2 bleeds across
        let wet1 = wet * (1.0 + width) / 2.0;
        let wet2 = wet * (1.0 - width) / 2.0;

        for i in 0..buffer.len() {
            let input_left = buffer.samples[0][i];
            let input_right = buffer.samples[1][i];
            let input = (input_left + input_right) * FIXED_GAIN;

            let out_left = self.left.process(input, pre_delay);
            let out_right = self.right.process(input, pre_delay);

            buffer.samples[0][i] = input_left + out_left * wet1 + out_right * wet2;
            buffer.samples[1][i] = input_right + out_right * wet1 + out_left * wet2;
        }
    }
}

impl Default for Reverb {
    fn default() -> Self {
        Self::new(ReverbParams::fixed())
    }
}

impl Effect for Reverb {
    fn process(&mut self, buffer: &mut AudioBuffer) -> Result<()> {
        self.params.validate()?;
        if buffer.sample_rate != self.sample_rate {
            self.prepare(buffer.sample_rate);
        }

        match buffer.channels() {
            0 => {}
            1 => self.process_mono(buffer),
            _ => self.process_stereo(buffer),
        }

        if !buffer.is_finite() {
            return Err(PanverbError::DspOverflow {
                effect: self.effect_type().to_string(),
            });
        }
        Ok(())
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;

        let room = (self.params.room_scale as f64).max(MIN_ROOM_SCALE);
        let scale = sample_rate as f64 / REFERENCE_SAMPLE_RATE * room;
        let max_pre_delay = ((MAX_PRE_DELAY_MS / 1000.0) * sample_rate as f32) as usize;

        self.left = ReverbChannel::new(scale, 0, max_pre_delay);
        self.right = ReverbChannel::new(scale, STEREO_SPREAD, max_pre_delay);
        self.pre_delay_samples =
            (((self.params.pre_delay_ms / 1000.0) * sample_rate as f32) as usize).min(max_pre_delay);
        self.update_coefficients();
    }

    fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
    }

    fn effect_type(&self) -> &'static str {
        "reverb"
    }

    fn get_params(&self) -> serde_json::Value {
        serde_json::to_value(&self.params).unwrap_or_default()
    }
}

// ============================================================================
// Reverb Stage
// ============================================================================

/// Decode `input`, apply the fixed reverb, and write `output`
///
/// The output container follows `output`'s extension (WAV or FLAC).
pub fn apply_reverb(input: &Path, output: &Path, format: ExportFormat) -> Result<()> {
    OutputFormat::from_path(output)?.check_bit_depth(format.bit_depth)?;

    let mut buffer = import_audio(input)?;
    let mut reverb = Reverb::new(ReverbParams::fixed());
    reverb.prepare(buffer.sample_rate);
    debug!("Reverb params: {}", reverb.get_params());

    reverb.process(&mut buffer)?;
    info!(
        "Reverb rendered {:.3}s, peak {:.1} dBFS, RMS {:.1} dBFS",
        buffer.duration_secs(),
        calculate_peak(&buffer),
        calculate_rms(&buffer)
    );

    export_audio(&buffer, output, format)
}

// ============================================================================
// Tests
// ============================================================================
