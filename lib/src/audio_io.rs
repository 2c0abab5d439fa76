//! Audio I/O boundary
//!
//! Decodes any symphonia-supported container (wav, flac, ogg, mp3, ...) to a
//! mono f64 signal for the engine, and writes enhanced output as float WAV.
//! Multi-channel input is mixed down to mono before it reaches the engine;
//! resampling, if needed, is the caller's concern. Output files are
//! published atomically: the WAV is written to a temporary sibling path and
//! renamed into place only once complete, so a failed call never leaves a
//! partial file at the destination.

use crate::error::EnhanceError;
use crate::Result;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Metadata of a decoded signal
#[derive(Debug, Clone)]
pub struct AudioInfo {
    pub sample_rate: u32,
    /// Channel count of the source, before the mono mixdown
    pub source_channels: usize,
    pub duration_samples: usize,
    pub duration_seconds: f64,
}

impl AudioInfo {
    pub fn new(sample_rate: u32, source_channels: usize, duration_samples: usize) -> Self {
        Self {
            sample_rate,
            source_channels,
            duration_samples,
            duration_seconds: duration_samples as f64 / sample_rate as f64,
        }
    }
}

/// Decode an audio file to a mono f64 signal
pub fn read_audio_file<P: AsRef<Path>>(path: P) -> Result<(AudioInfo, Vec<f64>)> {
    let file = File::open(path.as_ref())?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| EnhanceError::Decode(format!("unsupported format: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| EnhanceError::Decode("no default audio track".to_string()))?;
    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| EnhanceError::Decode("sample rate not specified".to_string()))?;
    let channels = track
        .codec_params
        .channels
        .ok_or_else(|| EnhanceError::Decode("channel layout not specified".to_string()))?
        .count();

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| EnhanceError::Decode(format!("unsupported codec: {}", e)))?;

    let mut mono: Vec<f64> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f64>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(EnhanceError::Decode(err.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(err)) => {
                // Recoverable per symphonia's contract; skip the packet
                log::warn!("skipping undecodable packet: {}", err);
                continue;
            }
            Err(err) => return Err(EnhanceError::Decode(err.to_string())),
        };

        let buf = sample_buf.get_or_insert_with(|| {
            SampleBuffer::<f64>::new(decoded.capacity() as u64, *decoded.spec())
        });
        buf.copy_interleaved_ref(decoded);

        // Mix interleaved channels down to mono
        for frame in buf.samples().chunks(channels) {
            mono.push(frame.iter().sum::<f64>() / channels as f64);
        }
    }

    let info = AudioInfo::new(sample_rate, channels, mono.len());
    Ok((info, mono))
}

/// Write a mono signal as a 32-bit float WAV file
pub fn write_wav<P: AsRef<Path>>(path: P, sample_rate: u32, samples: &[f64]) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let file = File::create(path.as_ref())?;
    let mut writer = hound::WavWriter::new(BufWriter::new(file), spec)?;
    for &sample in samples {
        writer.write_sample(sample as f32)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Write a mono WAV and publish it atomically via rename
pub fn write_wav_atomic<P: AsRef<Path>>(path: P, sample_rate: u32, samples: &[f64]) -> Result<()> {
    let path = path.as_ref();
    let tmp = temp_sibling(path);

    if let Err(err) = write_wav(&tmp, sample_rate, samples) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}
