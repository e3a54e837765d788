//! panverb - autopan + reverb audio converter
//!
//! Converts one audio file into another through a fixed two-stage chain:
//! 1. Autopan: a slow sine sweep of the stereo balance, applied in 50ms chunks
//! 2. Reverb: Freeverb with a fixed parameter set
//!
//! Progress is reported as `PROGRESS:<n>` lines and failures as a single
//! `ERROR:<message>` line, see [`pipeline::progress`].

pub mod cli;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod pipeline;

pub use error::{PanverbError, Result};
pub use pipeline::{process_audio, run, PipelineConfig};
