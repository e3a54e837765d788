//! CLI Command Implementations
//!
//! Turns parsed arguments into a pipeline run and an exit code.

use std::process::ExitCode;

use anyhow::Context;
use log::info;

use super::Cli;
use crate::pipeline::{self, LineSink, PipelineConfig};

/// Build the run configuration from `--config` and the override flags.
pub fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(freq) = cli.freq {
        config.autopan.freq_hz = freq;
    }
    if let Some(amount) = cli.amount {
        config.autopan.amount = amount;
    }
    if let Some(bit_depth) = cli.bit_depth {
        config.output_bit_depth = bit_depth;
    }

    Ok(config)
}

/// Convert `cli.input` into `cli.output`, reporting on stdout.
pub fn convert(cli: &Cli) -> ExitCode {
    if !cli.input.exists() {
        println!("Error: Input file {} not found", cli.input.display());
        return ExitCode::FAILURE;
    }

    let config = match load_config(cli) {
        Ok(config) => config,
        Err(e) => {
            println!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Converting {} -> {}",
        cli.input.display(),
        cli.output.display()
    );

    let mut sink = LineSink::stdout();
    if pipeline::run(&cli.input, &cli.output, &config, &mut sink) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    #[test]
    fn test_load_config_defaults() {
        let cli = Cli::try_parse_from(["panverb", "in.wav", "out.wav"]).unwrap();
        assert_eq!(load_config(&cli).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("panverb.json");
        std::fs::write(
            &path,
            r#"{"autopan": {"freq_hz": 0.5, "amount": 0.3}, "output_bit_depth": 32}"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "panverb",
            "in.wav",
            "out.wav",
            "--config",
            path.to_str().unwrap(),
            "--amount",
            "0.9",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();

        assert_eq!(config.autopan.freq_hz, 0.5);
        assert_eq!(config.autopan.amount, 0.9);
        assert_eq!(config.output_bit_depth, 32);
    }

    #[test]
    fn test_missing_config_file_has_context() {
        let cli = Cli::try_parse_from([
            "panverb",
            "in.wav",
            "out.wav",
            "--config",
            "/nonexistent/panverb.json",
        ])
        .unwrap();
        let err = load_config(&cli).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load config"));
    }
}
