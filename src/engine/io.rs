//! Audio file I/O for panverb
//!
//! WAV files are read with hound first; WAV variants hound can't parse
//! (mu-law, A-law, ADPCM) and every other container go through symphonia's
//! probe. Output is WAV (hound) or FLAC (flacenc), chosen by extension.
//!
//! Audio keeps its source sample rate. Only mono and stereo are accepted.

use std::fs::File;
use std::path::Path;

use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::error::Verify;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, warn};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::engine::buffer::{AudioBuffer, ChannelLayout};
use crate::error::{PanverbError, Result};

/// Container written for a given output path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Wav,
    Flac,
}

impl OutputFormat {
    /// Infer the output container from a path's extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("wav") | Some("wave") => Ok(OutputFormat::Wav),
            Some("flac") => Ok(OutputFormat::Flac),
            // No lossy encoders: MP3, OGG, AAC etc. stay input-only
            Some(other) => Err(PanverbError::UnsupportedFormat {
                format: format!(".{} output (only .wav and .flac are supported)", other),
            }),
            None => Err(PanverbError::UnsupportedFormat {
                format: format!("{} has no file extension", path.display()),
            }),
        }
    }

    /// Check that the container can store samples at `bit_depth`
    ///
    /// WAV takes 16/24-bit integer or 32-bit float; FLAC is integer only.
    pub fn check_bit_depth(self, bit_depth: u16) -> Result<()> {
        let supported = match self {
            OutputFormat::Wav => matches!(bit_depth, 16 | 24 | 32),
            OutputFormat::Flac => matches!(bit_depth, 16 | 24),
        };
        if supported {
            Ok(())
        } else {
            Err(PanverbError::UnsupportedFormat {
                format: format!("{}-bit {} output", bit_depth, self.name()),
            })
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Wav => "WAV",
            OutputFormat::Flac => "FLAC",
        }
    }
}

/// Export format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    /// Bit depth: 16, 24 (integer PCM) or 32 (float)
    pub bit_depth: u16,
}

impl Default for ExportFormat {
    fn default() -> Self {
        Self::pcm16()
    }
}

impl ExportFormat {
    pub fn new(bit_depth: u16) -> Self {
        ExportFormat { bit_depth }
    }

    /// 16-bit integer PCM
    pub fn pcm16() -> Self {
        ExportFormat { bit_depth: 16 }
    }

    /// 24-bit integer PCM
    pub fn pcm24() -> Self {
        ExportFormat { bit_depth: 24 }
    }

    /// 32-bit float, lossless for internal buffers
    pub fn float32() -> Self {
        ExportFormat { bit_depth: 32 }
    }
}

/// Decode an audio file into an AudioBuffer
///
/// # Errors
/// * `InputNotFound` - If the file does not exist
/// * `InvalidAudio` / `Decode` - If the file cannot be parsed
/// * `UnsupportedFormat` - If the audio has more than 2 channels
pub fn import_audio(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(PanverbError::InputNotFound {
            path: path.display().to_string(),
        });
    }

    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav") || e.eq_ignore_ascii_case("wave"))
        .unwrap_or(false);

    let buffer = if is_wav {
        import_wav(path)?
    } else {
        import_with_symphonia(path)?
    };

    debug!(
        "Decoded {}: {} ch, {} Hz, {:.3}s",
        path.display(),
        buffer.channels(),
        buffer.sample_rate,
        buffer.duration_secs()
    );

    Ok(buffer)
}

/// Write an AudioBuffer to `path`, in the container its extension names
///
/// Integer depths are clamped to full scale; 32-bit float is written as-is.
pub fn export_audio(buffer: &AudioBuffer, path: &Path, format: ExportFormat) -> Result<()> {
    let container = OutputFormat::from_path(path)?;
    container.check_bit_depth(format.bit_depth)?;

    match container {
        OutputFormat::Wav => export_wav(buffer, path, format),
        OutputFormat::Flac => export_flac(buffer, path, format),
    }
}

fn export_wav(buffer: &AudioBuffer, path: &Path, format: ExportFormat) -> Result<()> {
    let sample_format = match format.bit_depth {
        32 => SampleFormat::Float,
        _ => SampleFormat::Int,
    };

    let spec = WavSpec {
        channels: buffer.channels() as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: format.bit_depth,
        sample_format,
    };

    let write_err = |e: hound::Error| PanverbError::AudioWrite {
        path: path.display().to_string(),
        source: e,
    };

    let mut writer = WavWriter::create(path, spec).map_err(write_err)?;

    let interleaved = buffer.to_interleaved();
    match format.bit_depth {
        16 => {
            for sample in interleaved {
                let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled).map_err(write_err)?;
            }
        }
        24 => {
            for sample in interleaved {
                // 24-bit stored as i32 in hound
                let scaled = (sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                writer.write_sample(scaled).map_err(write_err)?;
            }
        }
        _ => {
            for sample in interleaved {
                writer.write_sample(sample).map_err(write_err)?;
            }
        }
    }

    writer.finalize().map_err(write_err)?;
    Ok(())
}

fn export_flac(buffer: &AudioBuffer, path: &Path, format: ExportFormat) -> Result<()> {
    let encode_err = |reason: String| PanverbError::Encode {
        path: path.display().to_string(),
        reason,
    };

    let full_scale = match format.bit_depth {
        16 => 32767.0,
        _ => 8388607.0,
    };
    let samples: Vec<i32> = buffer
        .to_interleaved()
        .into_iter()
        .map(|s| (s * full_scale).clamp(-full_scale - 1.0, full_scale) as i32)
        .collect();

    let config = flacenc::config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| encode_err(format!("invalid encoder config: {:?}", e)))?;
    let source = flacenc::source::MemSource::from_samples(
        &samples,
        buffer.channels(),
        format.bit_depth as usize,
        buffer.sample_rate as usize,
    );
    let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| encode_err(format!("{:?}", e)))?;

    let mut sink = ByteSink::new();
    stream
        .write(&mut sink)
        .map_err(|_| encode_err("failed to serialize FLAC stream".to_string()))?;
    std::fs::write(path, sink.as_slice())?;

    debug!(
        "Encoded {} frames of {}-bit FLAC to {}",
        buffer.len(),
        format.bit_depth,
        path.display()
    );
    Ok(())
}

/// Generate a mono sine test tone
pub fn generate_test_tone(frequency: f32, duration_secs: f32, sample_rate: u32) -> AudioBuffer {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let mut buffer = AudioBuffer::new(num_samples, ChannelLayout::Mono, sample_rate);

    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;
    for (i, sample) in buffer.samples[0].iter_mut().enumerate() {
        *sample = (angular_freq * i as f32).sin();
    }

    buffer
}

/// Generate a stereo test tone with different frequencies per channel
pub fn generate_stereo_test_tone(
    freq_left: f32,
    freq_right: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> AudioBuffer {
    let left = generate_test_tone(freq_left, duration_secs, sample_rate);
    let right = generate_test_tone(freq_right, duration_secs, sample_rate);

    AudioBuffer {
        samples: vec![left.samples[0].clone(), right.samples[0].clone()],
        sample_rate,
    }
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn layout_for(channels: usize) -> Result<ChannelLayout> {
    match ChannelLayout::from_count(channels) {
        Some(layout) => Ok(layout),
        None if channels == 0 => Err(PanverbError::InvalidAudio {
            reason: "audio stream has no channels".to_string(),
            source: None,
        }),
        None => Err(PanverbError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono/stereo supported)", channels),
        }),
    }
}

fn invalid_wav(path: &Path, e: hound::Error) -> PanverbError {
    PanverbError::InvalidAudio {
        reason: format!("Failed to open WAV file {}: {}", path.display(), e),
        source: Some(Box::new(e)),
    }
}

fn import_wav(path: &Path) -> Result<AudioBuffer> {
    let reader = match WavReader::open(path) {
        Ok(reader) => reader,
        Err(e @ (hound::Error::Unsupported | hound::Error::FormatError(_))) => {
            debug!(
                "hound can't read {} ({}), retrying with symphonia",
                path.display(),
                e
            );
            // Keep hound's diagnosis when symphonia can't make sense of it either
            return import_with_symphonia(path).map_err(|fallback| match fallback {
                PanverbError::Decode { .. } => invalid_wav(path, e),
                other => other,
            });
        }
        Err(e) => return Err(invalid_wav(path, e)),
    };

    let spec = reader.spec();
    let layout = layout_for(spec.channels as usize)?;
    let samples = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;

    AudioBuffer::from_interleaved(&samples, layout, spec.sample_rate)
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let read_err = |e: hound::Error| PanverbError::InvalidAudio {
        reason: format!("Failed to read {}-bit samples: {}", bits_per_sample, e),
        source: Some(Box::new(e)),
    };

    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(read_err),
        SampleFormat::Int => {
            let scale = match bits_per_sample {
                8 => 128.0,
                16 => 32768.0,
                24 => 8388608.0,
                32 => 2147483648.0,
                _ => {
                    return Err(PanverbError::UnsupportedFormat {
                        format: format!("{}-bit integer audio", bits_per_sample),
                    })
                }
            };
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(read_err)
        }
    }
}

fn import_with_symphonia(path: &Path) -> Result<AudioBuffer> {
    let decode_err = |reason: String| PanverbError::Decode {
        path: path.display().to_string(),
        reason,
    };

    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Help the format registry guess the format
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| decode_err(format!("failed to probe file: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| decode_err("no audio tracks found".to_string()))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count());

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_err(format!("failed to create decoder: {}", e)))?;

    let mut interleaved = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(decode_err(format!("error reading packet: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping undecodable packet in {}: {}", path.display(), e);
                continue;
            }
            Err(e) => return Err(decode_err(format!("decode error: {}", e))),
        };

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        channels.get_or_insert(spec.channels.count());

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(sample_buf.samples());
    }

    let sample_rate =
        sample_rate.ok_or_else(|| decode_err("stream has no sample rate".to_string()))?;
    let layout = layout_for(channels.unwrap_or(0))?;

    AudioBuffer::from_interleaved(&interleaved, layout, sample_rate)
}

// ============================================================================
// Tests
// ============================================================================
