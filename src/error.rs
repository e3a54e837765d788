//! Error handling for panverb
//!
//! Every failure carries a stable error code and a recovery hint so the
//! `ERROR:` line on stdout can stay short while logs give the detail.

use thiserror::Error;

/// Result type alias for panverb operations
pub type Result<T> = std::result::Result<T, PanverbError>;

/// Main error type for panverb operations
#[derive(Error, Debug)]
pub enum PanverbError {
    // File Errors
    #[error("Input file {path} not found")]
    InputNotFound { path: String },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Failed to encode {path}: {reason}")]
    Encode { path: String, reason: String },

    #[error("Failed to write audio file {path}: {source}")]
    AudioWrite {
        path: String,
        #[source]
        source: hound::Error,
    },

    // Processing Errors
    #[error("Invalid parameter: {param} = {value} (valid range: {min}..={max})")]
    InvalidParameter {
        param: String,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("DSP overflow: {effect} produced invalid audio (NaN/Inf)")]
    DspOverflow { effect: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PanverbError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            PanverbError::InputNotFound { .. } => "INPUT_NOT_FOUND",
            PanverbError::InvalidAudio { .. } => "INVALID_AUDIO",
            PanverbError::Decode { .. } => "DECODE_ERROR",
            PanverbError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            PanverbError::Encode { .. } => "ENCODE_ERROR",
            PanverbError::AudioWrite { .. } => "AUDIO_WRITE_ERROR",
            PanverbError::InvalidParameter { .. } => "INVALID_PARAMETER",
            PanverbError::DspOverflow { .. } => "DSP_OVERFLOW",
            PanverbError::Io(_) => "IO_ERROR",
            PanverbError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Returns a suggested recovery action for this error
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            PanverbError::InputNotFound { .. } => "Check the input path is correct",
            PanverbError::InvalidAudio { .. } | PanverbError::Decode { .. } => {
                "Check if the file plays in another application, or convert it to WAV first"
            }
            PanverbError::UnsupportedFormat { .. } => {
                "Write to a .wav or .flac output (FLAC at 16 or 24 bits); inputs must be mono or stereo"
            }
            PanverbError::Encode { .. } => "Try writing a .wav output instead",
            PanverbError::AudioWrite { .. } | PanverbError::Io(_) => {
                "Check the output directory exists, is writable and has free space"
            }
            PanverbError::InvalidParameter { .. } => {
                "Adjust the parameter to be within valid range"
            }
            PanverbError::DspOverflow { .. } => "The input may contain invalid samples",
            PanverbError::Serialization(_) => "Check the config file is valid JSON",
        }
    }
}
