//! Effect trait definition
//!
//! Base trait for the processors in the render chain.

use crate::engine::AudioBuffer;
use crate::error::Result;

/// Base trait for all DSP effects
///
/// Effects process audio buffers in-place. Parameters are fixed at
/// construction; the chain never edits them mid-render.
pub trait Effect {
    /// Process audio buffer in-place
    ///
    /// An effect may change the channel count (autopan always yields stereo)
    /// but never the number of frames.
    fn process(&mut self, buffer: &mut AudioBuffer) -> Result<()>;

    /// Prepare the effect for a given sample rate
    fn prepare(&mut self, sample_rate: u32);

    /// Clear any internal state (filter history, delay lines)
    fn reset(&mut self);

    /// Get the effect type identifier
    fn effect_type(&self) -> &'static str;

    /// Get all parameters as JSON (for logging)
    fn get_params(&self) -> serde_json::Value;
}
