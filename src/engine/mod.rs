//! Audio Engine Module
//!
//! Core audio plumbing:
//! - Audio buffer management
//! - File decode/encode

pub mod buffer;
pub mod io;

pub use buffer::{AudioBuffer, ChannelLayout};
pub use io::{export_audio, import_audio, ExportFormat, OutputFormat};
