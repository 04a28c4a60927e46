use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

use crate::audio::AudioDescriptor;
use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub keyword: KeywordConfig,
    pub audio: AudioConfig,
    #[serde(default)]
    pub session: SessionSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct KeywordConfig {
    /// Spoken trigger phrase, shown in the transcript banner
    pub keyword: String,
    /// Path to the keyword spotting model file
    pub model_path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// "file" or "microphone"
    pub input: String,
    /// WAV file used when `input = "file"`
    pub wav_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionSettings {
    /// Recognition language passed to the engine
    pub language: Option<String>,
}

impl Config {
    /// Load from a config file (extension optional) with `KEYWORD_SESSION__*` env overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("KEYWORD_SESSION").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn audio_descriptor(&self) -> Result<AudioDescriptor> {
        match self.audio.input.as_str() {
            "file" => {
                let path = self.audio.wav_file.clone().ok_or_else(|| {
                    anyhow::anyhow!("audio.wav_file is required when audio.input = \"file\"")
                })?;
                Ok(AudioDescriptor::File(path))
            }
            "microphone" => Ok(AudioDescriptor::Microphone),
            other => anyhow::bail!(
                "Unknown audio input '{}' (expected \"file\" or \"microphone\")",
                other
            ),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        let mut session = SessionConfig::new(self.keyword.keyword.clone());
        if let Some(language) = &self.session.language {
            session.language = language.clone();
        }
        session
    }
}
