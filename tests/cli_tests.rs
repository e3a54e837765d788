//! CLI Tests
//!
//! Runs the built `panverb` binary and checks its stdout protocol and exit
//! codes.

use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use panverb::engine::io::generate_test_tone;
use panverb::engine::{export_audio, AudioBuffer, ChannelLayout, ExportFormat};

fn panverb(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_panverb"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_converts_silence() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("silence.wav");
    let output = dir.path().join("out.wav");
    export_audio(
        &AudioBuffer::new(44100, ChannelLayout::Mono, 44100),
        &input,
        ExportFormat::pcm16(),
    )
    .unwrap();

    let result = panverb(&[path_str(&input), path_str(&output)]);
    assert_eq!(result.status.code(), Some(0));
    assert!(output.exists());

    let lines = stdout_lines(&result);
    assert!(lines.iter().all(|l| l.starts_with("PROGRESS:")));
    for milestone in ["PROGRESS:0", "PROGRESS:25", "PROGRESS:50", "PROGRESS:75"] {
        assert!(lines.iter().any(|l| l == milestone), "missing {}", milestone);
    }
    assert_eq!(lines.last().map(String::as_str), Some("PROGRESS:100"));
}

#[test]
fn test_missing_input_exits_1() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("missing.wav");
    let output = dir.path().join("out.wav");

    let result = panverb(&[path_str(&input), path_str(&output)]);
    assert_eq!(result.status.code(), Some(1));

    let lines = stdout_lines(&result);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("Error: Input file"));
    assert!(lines[0].contains("not found"));
    assert!(!output.exists());
}

#[test]
fn test_corrupt_input_exits_1_with_error_line() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("broken.wav");
    let output = dir.path().join("out.wav");
    std::fs::write(&input, b"not audio at all").unwrap();

    let result = panverb(&[path_str(&input), path_str(&output)]);
    assert_eq!(result.status.code(), Some(1));

    let lines = stdout_lines(&result);
    assert_eq!(lines.first().map(String::as_str), Some("PROGRESS:0"));
    assert_eq!(lines.iter().filter(|l| l.starts_with("ERROR:")).count(), 1);
    assert!(!lines.iter().any(|l| l == "PROGRESS:100"));
}

#[test]
fn test_unsupported_output_extension() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("tone.wav");
    let output = dir.path().join("out.ogg");
    export_audio(
        &generate_test_tone(440.0, 0.2, 44100),
        &input,
        ExportFormat::pcm16(),
    )
    .unwrap();

    let result = panverb(&[path_str(&input), path_str(&output)]);
    assert_eq!(result.status.code(), Some(1));
    assert!(stdout_lines(&result).iter().any(|l| l.starts_with("ERROR:")));
    assert!(!output.exists());
}

#[test]
fn test_wrong_argument_count_prints_usage() {
    let result = panverb(&["only-one.wav"]);
    assert_eq!(result.status.code(), Some(1));
    assert_eq!(
        stdout_lines(&result),
        vec!["Usage: panverb <input_file> <output_file>".to_string()]
    );

    let result = panverb(&[]);
    assert_eq!(result.status.code(), Some(1));
}

#[test]
fn test_help_exits_0() {
    let result = panverb(&["--help"]);
    assert_eq!(result.status.code(), Some(0));
}
