use anyhow::{Context, Result};
use hound::WavReader;
use std::path::Path;
use tracing::info;

/// Header-level view of a WAV file bound to a session.
///
/// Samples are not decoded here; the recognition engine streams them itself.
#[derive(Debug, Clone)]
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file {}", path.display()))?;

        let spec = reader.spec();
        // duration() counts frames (samples per channel)
        let frames = reader.duration();
        if spec.sample_rate == 0 {
            anyhow::bail!("WAV file {} reports a zero sample rate", path.display());
        }

        let duration_seconds = frames as f64 / spec.sample_rate as f64;

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} bits",
            duration_seconds, spec.sample_rate, spec.channels, spec.bits_per_sample
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
        })
    }

    pub fn is_speech_format(&self) -> bool {
        self.sample_rate == 16000 && self.channels == 1 && self.bits_per_sample == 16
    }
}
