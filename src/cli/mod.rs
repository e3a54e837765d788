//! CLI Module
//!
//! Command-line interface for the panverb converter.

pub mod commands;

use clap::Parser;
use std::path::PathBuf;

/// Usage line printed to stdout when the arguments don't parse
pub const USAGE: &str = "Usage: panverb <input_file> <output_file>";

/// panverb - slow autopan followed by a fixed reverb
#[derive(Parser, Debug)]
#[command(name = "panverb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Input audio file (WAV, FLAC, MP3, OGG, ...)
    pub input: PathBuf,

    /// Output file (.wav or .flac)
    pub output: PathBuf,

    /// Autopan LFO rate in Hz
    #[arg(long, value_name = "HZ")]
    pub freq: Option<f32>,

    /// Autopan sweep depth (0-1)
    #[arg(long, value_name = "A")]
    pub amount: Option<f32>,

    /// Output bit depth (16, 24, or 32 for WAV float)
    #[arg(long, value_name = "N")]
    pub bit_depth: Option<u16>,

    /// JSON pipeline config; flags override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positionals() {
        let cli = Cli::try_parse_from(["panverb", "in.mp3", "out.wav"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("in.mp3"));
        assert_eq!(cli.output, PathBuf::from("out.wav"));
        assert!(cli.freq.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "panverb",
            "in.wav",
            "out.wav",
            "--freq",
            "0.2",
            "--amount",
            "0.5",
            "--bit-depth",
            "24",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.freq, Some(0.2));
        assert_eq!(cli.amount, Some(0.5));
        assert_eq!(cli.bit_depth, Some(24));
        assert!(cli.verbose);
    }

    #[test]
    fn test_missing_output_is_an_error() {
        assert!(Cli::try_parse_from(["panverb", "in.wav"]).is_err());
    }

    #[test]
    fn test_extra_positional_is_an_error() {
        assert!(Cli::try_parse_from(["panverb", "a.wav", "b.wav", "c.wav"]).is_err());
    }
}
