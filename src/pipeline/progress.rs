//! Progress reporting
//!
//! The stdout protocol is line-oriented and flushed per line:
//!
//! ```text
//! PROGRESS:<0-100>
//! ERROR:<message>
//! ```
//!
//! Progress values never decrease. `ERROR:` appears at most once and
//! replaces the final `PROGRESS:100`.

use std::io::{self, Stdout, Write};

use log::warn;

/// Receiver for pipeline progress and failure notifications
pub trait ProgressSink {
    /// Report overall progress in percent (0-100)
    fn progress(&mut self, percent: u8);

    /// Report the single terminal failure of a run
    fn error(&mut self, message: &str);
}

/// Writes the line protocol to any writer, flushing after every line
#[derive(Debug)]
pub struct LineSink<W: Write> {
    out: W,
}

impl LineSink<Stdout> {
    /// Sink bound to the process's standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> LineSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) {
        // A closed stdout must not abort the render
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            warn!("Failed to write progress line {:?}: {}", line, e);
        }
    }
}

impl<W: Write> ProgressSink for LineSink<W> {
    fn progress(&mut self, percent: u8) {
        self.write_line(&format!("PROGRESS:{}", percent.min(100)));
    }

    fn error(&mut self, message: &str) {
        // Keep the protocol one line per event
        let message = message.replace(['\r', '\n'], " ");
        self.write_line(&format!("ERROR:{}", message));
    }
}

/// A single recorded notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Progress(u8),
    Error(String),
}

/// Keeps every notification in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub events: Vec<ProgressEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All reported percentages, in order
    pub fn percentages(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Progress(p) => Some(*p),
                ProgressEvent::Error(_) => None,
            })
            .collect()
    }

    /// All reported error messages, in order
    pub fn errors(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Error(msg) => Some(msg.as_str()),
                ProgressEvent::Progress(_) => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn progress(&mut self, percent: u8) {
        self.events.push(ProgressEvent::Progress(percent));
    }

    fn error(&mut self, message: &str) {
        self.events.push(ProgressEvent::Error(message.to_string()));
    }
}
