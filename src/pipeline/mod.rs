//! Render pipeline
//!
//! Runs one conversion end to end:
//!
//! ```text
//! START(0) → DECODED(25) → AUTOPANNED(50) → ENCODED_TEMP → REVERBED(75) → DONE(100)
//! ```
//!
//! The autopanned audio is handed to the reverb stage through a temporary
//! 32-bit float WAV. Writing it has no percentage of its own: 75 is reported
//! once it is on disk, as the reverb stage takes over. The temp file is owned
//! by the run and removed when it goes out of scope, including on every
//! error path.

pub mod progress;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::dsp::{apply_reverb, Autopan, AutopanParams};
use crate::engine::{export_audio, import_audio, ExportFormat, OutputFormat};
use crate::error::{PanverbError, Result};

pub use progress::{LineSink, ProgressEvent, ProgressSink, RecordingSink};

/// Progress milestones of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Decoded,
    Autopanned,
    Reverbed,
    Done,
}

impl Stage {
    /// Percentage reported when the stage is reached
    pub fn percent(self) -> u8 {
        match self {
            Stage::Start => 0,
            Stage::Decoded => 25,
            Stage::Autopanned => 50,
            Stage::Reverbed => 75,
            Stage::Done => 100,
        }
    }
}

/// Map autopan's chunk fraction into the [25, 50] band
pub fn autopan_percent(fraction: f32) -> u8 {
    let start = Stage::Decoded.percent();
    let span = Stage::Autopanned.percent() - start;
    let scaled = (fraction.clamp(0.0, 1.0) * span as f32).floor() as u8;
    start + scaled.min(span)
}

/// Run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Autopan sweep
    pub autopan: AutopanParams,
    /// Output bit depth: 16, 24 or 32 (float, WAV only)
    pub output_bit_depth: u16,
    /// Directory for the intermediate render (system temp dir if unset)
    pub temp_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            autopan: AutopanParams::default(),
            output_bit_depth: 16,
            temp_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Load a config from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.autopan.validate()?;
        if !matches!(self.output_bit_depth, 16 | 24 | 32) {
            return Err(PanverbError::UnsupportedFormat {
                format: format!(
                    "{}-bit output (only 16, 24, 32 supported)",
                    self.output_bit_depth
                ),
            });
        }
        Ok(())
    }

    pub fn export_format(&self) -> ExportFormat {
        ExportFormat::new(self.output_bit_depth)
    }
}

/// Render `input` through autopan and reverb into `output`
///
/// Reports milestones and autopan progress to `sink`. Errors are returned
/// untouched; use [`run`] to have them reported as well.
pub fn process_audio(
    input: &Path,
    output: &Path,
    config: &PipelineConfig,
    sink: &mut dyn ProgressSink,
) -> Result<()> {
    sink.progress(Stage::Start.percent());

    config.validate()?;
    OutputFormat::from_path(output)?.check_bit_depth(config.output_bit_depth)?;

    let decoded = import_audio(input)?;
    info!(
        "Decoded {} ({} ch, {} Hz, {:.2}s)",
        input.display(),
        decoded.channels(),
        decoded.sample_rate,
        decoded.duration_secs()
    );
    sink.progress(Stage::Decoded.percent());

    let autopan = Autopan::new(config.autopan);
    let panned = autopan.apply(&decoded, |fraction| sink.progress(autopan_percent(fraction)))?;
    drop(decoded);
    sink.progress(Stage::Autopanned.percent());

    let temp = create_temp_file(config.temp_dir.as_deref())?;
    export_audio(&panned, temp.path(), ExportFormat::float32())?;
    debug!("Intermediate render written to {}", temp.path().display());
    sink.progress(Stage::Reverbed.percent());

    apply_reverb(temp.path(), output, config.export_format())?;
    info!("Wrote {}", output.display());

    release_temp_file(temp);
    sink.progress(Stage::Done.percent());
    Ok(())
}

/// Run a conversion, reporting any failure as the single `ERROR:` event
///
/// Returns `true` when the output was written.
pub fn run(
    input: &Path,
    output: &Path,
    config: &PipelineConfig,
    sink: &mut dyn ProgressSink,
) -> bool {
    match process_audio(input, output, config, sink) {
        Ok(()) => true,
        Err(e) => {
            error!("{} [{}]: {}", e, e.error_code(), e.recovery_hint());
            sink.error(&e.to_string());
            false
        }
    }
}

fn create_temp_file(dir: Option<&Path>) -> Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("panverb-").suffix(".wav");

    let temp = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    Ok(temp)
}

/// Delete the intermediate render; failure is only worth a warning
fn release_temp_file(temp: NamedTempFile) {
    let path = temp.path().to_path_buf();
    if let Err(e) = temp.close() {
        warn!("Could not remove temporary file {}: {}", path.display(), e);
    }
}
