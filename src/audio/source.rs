use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{info, warn};

use super::file::AudioFile;

/// Where a session's audio comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioDescriptor {
    /// Default microphone input
    Microphone,
    /// WAV file input (for testing/batch processing)
    File(PathBuf),
}

/// An opened audio source.
///
/// Not `Clone`: the handle is owned by exactly one session and is consumed
/// by [`AudioProvider::close`], so it can only be released once.
#[derive(Debug)]
pub struct AudioHandle {
    /// Provider-assigned id, unique per provider
    pub id: u64,
    pub descriptor: AudioDescriptor,
    /// Header metadata for file sources
    pub file: Option<AudioFile>,
}

/// Audio source provider
///
/// Implementations:
/// - File: WAV files read with hound
/// - Tests: in-memory providers counting open/close calls
#[async_trait::async_trait]
pub trait AudioProvider: Send + Sync {
    /// Open an audio source for exclusive use by one session
    async fn open(&self, descriptor: &AudioDescriptor) -> Result<AudioHandle>;

    /// Release a previously opened source
    async fn close(&self, handle: AudioHandle) -> Result<()>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Opens WAV files; microphone capture is left to the engine's platform layer
/// and reported as unavailable here.
#[derive(Debug, Default)]
pub struct FileAudioProvider {
    next_id: AtomicU64,
    open_handles: Mutex<HashSet<u64>>,
}

impl FileAudioProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles opened and not yet closed
    pub fn open_count(&self) -> usize {
        self.open_handles.lock().map(|h| h.len()).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl AudioProvider for FileAudioProvider {
    async fn open(&self, descriptor: &AudioDescriptor) -> Result<AudioHandle> {
        let file = match descriptor {
            AudioDescriptor::Microphone => {
                anyhow::bail!("Microphone input is not available from the file audio provider")
            }
            AudioDescriptor::File(path) => {
                let path = path.clone();
                tokio::task::spawn_blocking(move || AudioFile::open(path)).await??
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut handles) = self.open_handles.lock() {
            handles.insert(id);
        }

        info!("Opened audio source #{} ({})", id, file.path);

        Ok(AudioHandle {
            id,
            descriptor: descriptor.clone(),
            file: Some(file),
        })
    }

    async fn close(&self, handle: AudioHandle) -> Result<()> {
        let removed = self
            .open_handles
            .lock()
            .map(|mut handles| handles.remove(&handle.id))
            .unwrap_or(false);

        if !removed {
            warn!("Audio source #{} was not open", handle.id);
            anyhow::bail!("Audio source #{} was not open", handle.id);
        }

        info!("Closed audio source #{}", handle.id);
        Ok(())
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}
