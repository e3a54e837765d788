//! panverb CLI
//!
//! `panverb <input_file> <output_file>`: autopan, then reverb, with
//! `PROGRESS:`/`ERROR:` lines on stdout. Logs go to stderr.

use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use env_logger::Env;
use log::info;

use panverb::cli::{commands, Cli, USAGE};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = e.print();
                return ExitCode::SUCCESS;
            }
            _ => {
                println!("{}", USAGE);
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    let default_filter = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("panverb v{}", env!("CARGO_PKG_VERSION"));

    commands::convert(&cli)
}
