//! WAV clip loading
//!
//! Clips are expected as 16-bit PCM. Multi-channel files are reduced to a
//! single channel; the sample rate has to match what the feature extractor
//! was configured for.

use super::channel::ChannelExtractor;
use crate::error::{EdgeError, Result};
use std::path::Path;

/// A mono clip of signed 16-bit samples
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Load a 16-bit WAV file, keeping `channel` of a multi-channel recording
///
/// # Arguments
/// * `file_path` - Path to the WAV file
/// * `expected_rate` - Sample rate the caller's extractor works at
/// * `channel` - Channel to keep when the file is not mono
pub fn load_wav<P: AsRef<Path>>(file_path: P, expected_rate: u32, channel: usize) -> Result<AudioClip> {
    let path = file_path.as_ref();
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(EdgeError::InvalidInput(format!(
            "Audio file {} must be 16-bit PCM, got {} bits ({:?})",
            path.display(),
            spec.bits_per_sample,
            spec.sample_format
        )));
    }

    if spec.sample_rate != expected_rate {
        return Err(EdgeError::InvalidInput(format!(
            "Audio file {} must be {}Hz, got {}Hz",
            path.display(),
            expected_rate,
            spec.sample_rate
        )));
    }

    let interleaved = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let extractor = ChannelExtractor::new(channel, spec.channels as usize)?;
    let samples = extractor.extract_channel(&interleaved);

    log::info!(
        "Loaded {} samples from {} ({:.2}s at {}Hz)",
        samples.len(),
        path.display(),
        samples.len() as f32 / spec.sample_rate as f32,
        spec.sample_rate
    );

    Ok(AudioClip {
        samples,
        sample_rate: spec.sample_rate,
    })
}
