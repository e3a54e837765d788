//! DSP Effects Library
//!
//! The two processors of the render chain. Both implement the `Effect`
//! trait; the chain order is fixed: Autopan → Reverb.

mod autopan;
mod effect;
mod reverb;

pub use autopan::{
    chunk_bounds, chunk_start_secs, pan_gains, pan_position, Autopan, AutopanParams,
    DEFAULT_AMOUNT, DEFAULT_CHUNK_MS, DEFAULT_FREQ_HZ,
};
pub use effect::Effect;
pub use reverb::{apply_reverb, Reverb, ReverbParams};
