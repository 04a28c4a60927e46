// Shared fixtures for session integration tests
//
// Mock collaborators count every open/close so tests can assert that
// resources are released exactly once.
#![allow(dead_code)]

use anyhow::Result;
use keyword_session::{
    AudioDescriptor, AudioHandle, AudioProvider, EngineFactory, EventSink, KeywordModel,
    RecognitionEngine, SessionConfig, SessionController, SessionState,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

pub const WAIT: Duration = Duration::from_secs(2);

/// Write a silent 16kHz mono 16-bit WAV file
pub fn write_wav(dir: &Path, name: &str, seconds: u32) -> Result<PathBuf> {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(&path, spec)?;
    for _ in 0..(16000 * seconds) {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;

    Ok(path)
}

pub fn keyword_model() -> Arc<KeywordModel> {
    Arc::new(KeywordModel::from_bytes("models/keyword.table", vec![0x4b, 0x57, 0x53]).unwrap())
}

pub fn session_config() -> SessionConfig {
    SessionConfig::new("keyword")
}

pub fn clip() -> AudioDescriptor {
    AudioDescriptor::File(PathBuf::from("clips/hello-world.wav"))
}

/// Audio provider that hands out handles without touching the filesystem
#[derive(Default)]
pub struct CountingAudioProvider {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub fail_open: AtomicBool,
}

impl CountingAudioProvider {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AudioProvider for CountingAudioProvider {
    async fn open(&self, descriptor: &AudioDescriptor) -> Result<AudioHandle> {
        if self.fail_open.load(Ordering::SeqCst) {
            anyhow::bail!("device busy");
        }
        let id = self.opened.fetch_add(1, Ordering::SeqCst) as u64 + 1;
        Ok(AudioHandle {
            id,
            descriptor: descriptor.clone(),
            file: None,
        })
    }

    async fn close(&self, _handle: AudioHandle) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

#[derive(Default)]
pub struct EngineCounters {
    pub created: AtomicUsize,
    pub started: AtomicUsize,
    pub stopped: AtomicUsize,
    pub closed: AtomicUsize,
}

impl EngineCounters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

struct MockEngine {
    counters: Arc<EngineCounters>,
    fail_start: bool,
    fail_stop: bool,
    start_delay_ms: u64,
    stop_delay_ms: u64,
}

#[async_trait::async_trait]
impl RecognitionEngine for MockEngine {
    async fn start_keyword_recognition(&self, _model: Arc<KeywordModel>) -> Result<()> {
        if self.start_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.start_delay_ms)).await;
        }
        if self.fail_start {
            anyhow::bail!("keyword model rejected");
        }
        self.counters.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_keyword_recognition(&self) -> Result<()> {
        if self.stop_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.stop_delay_ms)).await;
        }
        self.counters.stopped.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop {
            anyhow::bail!("service unreachable");
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Engine factory whose event sinks are exposed to the test
#[derive(Default)]
pub struct MockEngineFactory {
    pub counters: Arc<EngineCounters>,
    pub fail_create: AtomicBool,
    pub fail_start: AtomicBool,
    pub fail_stop: AtomicBool,
    pub start_delay_ms: AtomicU64,
    pub stop_delay_ms: AtomicU64,
    sinks: Mutex<Vec<EventSink>>,
}

impl MockEngineFactory {
    /// Sink of the most recently created engine session
    pub fn sink(&self) -> EventSink {
        self.sinks
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no engine session created")
    }

    pub fn created(&self) -> usize {
        EngineCounters::get(&self.counters.created)
    }

    pub fn closed(&self) -> usize {
        EngineCounters::get(&self.counters.closed)
    }

    pub fn stopped(&self) -> usize {
        EngineCounters::get(&self.counters.stopped)
    }
}

#[async_trait::async_trait]
impl EngineFactory for MockEngineFactory {
    async fn create(
        &self,
        _config: &SessionConfig,
        _audio: &AudioHandle,
        events: EventSink,
    ) -> Result<Arc<dyn RecognitionEngine>> {
        if self.fail_create.load(Ordering::SeqCst) {
            anyhow::bail!("listener registration failed");
        }
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        self.sinks.lock().unwrap().push(events);

        Ok(Arc::new(MockEngine {
            counters: Arc::clone(&self.counters),
            fail_start: self.fail_start.load(Ordering::SeqCst),
            fail_stop: self.fail_stop.load(Ordering::SeqCst),
            start_delay_ms: self.start_delay_ms.load(Ordering::SeqCst),
            stop_delay_ms: self.stop_delay_ms.load(Ordering::SeqCst),
        }))
    }
}

pub struct Harness {
    pub audio: Arc<CountingAudioProvider>,
    pub engines: Arc<MockEngineFactory>,
    pub controller: SessionController,
}

impl Harness {
    pub fn new() -> Self {
        let audio = Arc::new(CountingAudioProvider::default());
        let engines = Arc::new(MockEngineFactory::default());
        let controller = SessionController::new(audio.clone(), engines.clone());
        Self {
            audio,
            engines,
            controller,
        }
    }

    pub async fn start(&self) -> Result<(), keyword_session::SessionError> {
        self.controller
            .start(session_config(), clip(), keyword_model())
            .await
    }
}

/// Poll until `condition` holds
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let polled = tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "timed out waiting until {}", what);
}

pub async fn wait_for_state(controller: &SessionController, state: SessionState) {
    let mut rx = controller.watch_state();
    tokio::time::timeout(WAIT, rx.wait_for(|s| *s == state))
        .await
        .expect("timed out waiting for state")
        .expect("controller dropped");
}

pub async fn wait_for_transcript(controller: &SessionController, expected: &[&str]) {
    let mut rx: watch::Receiver<Vec<String>> = controller.watch_transcript();
    let matches = |t: &Vec<String>| t.iter().map(String::as_str).eq(expected.iter().copied());
    let result = tokio::time::timeout(WAIT, rx.wait_for(matches)).await;
    if result.is_err() {
        panic!(
            "timed out waiting for transcript {:?}, last seen {:?}",
            expected,
            controller.transcript()
        );
    }
}
