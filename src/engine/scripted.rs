//! Scripted recognition engine
//!
//! Replays a fixed sequence of timed notifications once keyword recognition
//! starts. Used by the CLI demo and by tests that need a real engine
//! lifecycle without a speech runtime.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{CancellationReason, EngineFactory, EventSink, RecognitionEngine};
use crate::audio::AudioHandle;
use crate::keyword::KeywordModel;
use crate::session::SessionConfig;

/// One scripted notification; session ids are assigned by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptedEvent {
    SessionStarted,
    SessionStopped,
    Recognizing { text: String },
    Recognized { text: String },
    Canceled {
        reason: CancellationReason,
        #[serde(default)]
        details: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStep {
    /// Delay before this step, relative to the previous one
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(flatten)]
    pub event: ScriptedEvent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub steps: Vec<ScriptStep>,
}

impl Script {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine script {}", path.display()))?;
        serde_json::from_str(&contents).context("Failed to parse engine script")
    }

    /// Append a step with no delay
    pub fn then(mut self, event: ScriptedEvent) -> Self {
        self.steps.push(ScriptStep { delay_ms: 0, event });
        self
    }
}

#[derive(Default)]
struct ScriptedState {
    session_id: Option<String>,
    replay: Option<JoinHandle<()>>,
    closed: bool,
}

/// Engine session that replays a [`Script`]
pub struct ScriptedEngine {
    script: Script,
    events: EventSink,
    state: Arc<Mutex<ScriptedState>>,
}

impl ScriptedEngine {
    pub fn new(script: Script, events: EventSink) -> Self {
        Self {
            script,
            events,
            state: Arc::new(Mutex::new(ScriptedState::default())),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ScriptedState>> {
        self.state
            .lock()
            .map_err(|_| anyhow::anyhow!("Scripted engine state poisoned"))
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for ScriptedEngine {
    async fn start_keyword_recognition(&self, model: Arc<KeywordModel>) -> Result<()> {
        let mut state = self.lock()?;
        if state.closed {
            anyhow::bail!("Scripted engine is closed");
        }
        if state.replay.is_some() {
            anyhow::bail!("Keyword recognition already running");
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        info!(
            "Scripted engine listening for keyword (model: {}, session: {})",
            model.path.display(),
            session_id
        );
        state.session_id = Some(session_id.clone());

        let steps = self.script.steps.clone();
        let events = self.events.clone();
        state.replay = Some(tokio::spawn(async move {
            for step in steps {
                if step.delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(step.delay_ms)).await;
                }
                match step.event {
                    ScriptedEvent::SessionStarted => events.session_started(session_id.as_str()),
                    ScriptedEvent::SessionStopped => events.session_stopped(session_id.as_str()),
                    ScriptedEvent::Recognizing { text } => events.recognizing(text),
                    ScriptedEvent::Recognized { text } => events.recognized(text),
                    ScriptedEvent::Canceled { reason, details } => events.canceled(reason, details),
                }
            }
        }));

        Ok(())
    }

    async fn stop_keyword_recognition(&self) -> Result<()> {
        let mut state = self.lock()?;
        if let Some(replay) = state.replay.take() {
            replay.abort();
            if let Some(session_id) = &state.session_id {
                self.events.session_stopped(session_id.as_str());
            }
        } else {
            warn!("Scripted engine was not listening");
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.lock()?;
        if let Some(replay) = state.replay.take() {
            replay.abort();
        }
        state.closed = true;
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Builds a [`ScriptedEngine`] per session, all replaying the same script
#[derive(Debug, Clone, Default)]
pub struct ScriptedEngineFactory {
    script: Script,
}

impl ScriptedEngineFactory {
    pub fn new(script: Script) -> Self {
        Self { script }
    }
}

#[async_trait::async_trait]
impl EngineFactory for ScriptedEngineFactory {
    async fn create(
        &self,
        config: &SessionConfig,
        audio: &AudioHandle,
        events: EventSink,
    ) -> Result<Arc<dyn RecognitionEngine>> {
        info!(
            "Creating scripted engine ({} steps, language {}, audio #{})",
            self.script.steps.len(),
            config.language,
            audio.id
        );
        Ok(Arc::new(ScriptedEngine::new(self.script.clone(), events)))
    }
}
