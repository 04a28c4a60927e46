use super::config::SessionConfig;
use super::state::SessionState;
use super::stats::SessionStats;
use super::transcript::{Transcript, TranscriptEntry};
use crate::audio::{AudioDescriptor, AudioHandle, AudioProvider};
use crate::engine::{CancellationReason, EngineEvent, EngineFactory, EventSink, RecognitionEngine};
use crate::error::SessionError;
use crate::keyword::{KeywordModel, KeywordModelLoader};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Load a keyword model, reporting failures the way `start` reports its resources
pub async fn load_keyword_model(
    loader: &dyn KeywordModelLoader,
    path: &Path,
) -> Result<Arc<KeywordModel>, SessionError> {
    loader.load(path).await.map_err(|e| {
        error!("Failed to load keyword model: {:#}", e);
        SessionError::resource("keyword model", &e)
    })
}

/// Drives one keyword-gated recognition session at a time.
///
/// Engine notifications are queued per session and applied by a single
/// consumer task; `start` and `stop` sequences are serialized against each
/// other. Cloning yields another handle to the same controller.
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
}

/// Resources owned by the running session.
///
/// Moved out of the controller state by whichever path tears the session
/// down, so the engine and the audio source are released once.
struct ActiveSession {
    generation: u64,
    engine: Arc<dyn RecognitionEngine>,
    audio: AudioHandle,
    consumer: EventConsumer,
}

/// The task applying one session's engine notifications
struct EventConsumer {
    drain_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl EventConsumer {
    /// Apply everything still queued, then wait for the task to end
    async fn drain(self, generation: u64) {
        // The task may already be gone if every sink was dropped
        let _ = self.drain_tx.send(());
        if let Err(e) = self.task.await {
            error!("Event consumer for session #{} panicked: {}", generation, e);
        }
    }
}

struct Inner {
    state: SessionState,
    /// Incremented on every `start`; events carry the generation they belong to
    generation: u64,
    config: SessionConfig,
    session_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
    active: Option<ActiveSession>,
    transcript: Transcript,
    intermediate_updates: usize,
    final_results: usize,
    discarded_events: usize,
}

struct Shared {
    audio: Arc<dyn AudioProvider>,
    engines: Arc<dyn EngineFactory>,
    /// Held for the whole of a start or stop sequence
    lifecycle: Mutex<()>,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<SessionState>,
    transcript_tx: watch::Sender<Vec<String>>,
}

enum EventOutcome {
    Continue,
    /// The session this consumer belongs to is over
    Finished,
    /// Engine reported an unrecoverable error
    Fatal(String),
}

impl SessionController {
    pub fn new(audio: Arc<dyn AudioProvider>, engines: Arc<dyn EngineFactory>) -> Self {
        let transcript = Transcript::new();
        let (state_tx, _) = watch::channel(SessionState::Idle);
        let (transcript_tx, _) = watch::channel(transcript.snapshot());

        Self {
            shared: Arc::new(Shared {
                audio,
                engines,
                lifecycle: Mutex::new(()),
                inner: Mutex::new(Inner {
                    state: SessionState::Idle,
                    generation: 0,
                    config: SessionConfig::default(),
                    session_id: None,
                    started_at: None,
                    stopped_at: None,
                    active: None,
                    transcript,
                    intermediate_updates: 0,
                    final_results: 0,
                    discarded_events: 0,
                }),
                state_tx,
                transcript_tx,
            }),
        }
    }

    /// Open the audio source, create an engine session and request
    /// keyword-gated continuous recognition.
    ///
    /// Resolves once the engine accepted the request. On failure everything
    /// opened so far is released and the controller is back to `Idle`.
    pub async fn start(
        &self,
        config: SessionConfig,
        source: AudioDescriptor,
        model: Arc<KeywordModel>,
    ) -> Result<(), SessionError> {
        let shared = &self.shared;
        let _lifecycle = shared.lifecycle.lock().await;

        let generation = {
            let mut inner = shared.inner.lock().await;
            if inner.state != SessionState::Idle {
                warn!("Session already started ({})", inner.state);
                return Err(SessionError::AlreadyStarted(inner.state.to_string()));
            }

            inner.generation += 1;
            inner.state = SessionState::Starting;
            inner.config = config.clone();
            inner.session_id = None;
            inner.started_at = Some(Utc::now());
            inner.stopped_at = None;
            inner.transcript.reset();
            inner.intermediate_updates = 0;
            inner.final_results = 0;
            inner.discarded_events = 0;
            shared.publish(&inner);
            inner.generation
        };

        info!(
            "Starting keyword session #{} (keyword: {}, source: {:?} via {} provider)",
            generation,
            config.keyword,
            source,
            shared.audio.name()
        );

        let audio = match shared.audio.open(&source).await {
            Ok(audio) => audio,
            Err(e) => {
                error!("Failed to open audio source: {:#}", e);
                shared.return_to_idle().await;
                return Err(SessionError::resource("audio source", &e));
            }
        };

        let (events, event_rx) = EventSink::channel();
        let engine = match shared.engines.create(&config, &audio, events).await {
            Ok(engine) => engine,
            Err(e) => {
                error!("Failed to create recognition engine: {:#}", e);
                if let Err(close_err) = shared.audio.close(audio).await {
                    warn!("Failed to close audio source: {:#}", close_err);
                }
                shared.return_to_idle().await;
                return Err(SessionError::resource("recognition engine", &e));
            }
        };

        let (drain_tx, drain_rx) = oneshot::channel();
        let task = tokio::spawn(
            Arc::clone(shared).consume_events(generation, event_rx, drain_rx),
        );

        let session = ActiveSession {
            generation,
            engine,
            audio,
            consumer: EventConsumer { drain_tx, task },
        };

        info!("Requesting keyword recognition from {} engine", session.engine.name());

        if let Err(e) = session.engine.start_keyword_recognition(model).await {
            error!("Engine rejected keyword recognition start: {:#}", e);
            shared.close_session(session).await;
            shared.return_to_idle().await;
            return Err(SessionError::StartFailed(format!("{:#}", e)));
        }

        let mut inner = shared.inner.lock().await;
        let banner = inner.config.idle_banner();
        inner.transcript.set_banner(banner);
        inner.state = SessionState::Listening;
        inner.active = Some(session);
        shared.publish(&inner);

        info!("Keyword recognition started, say `{}`", config.keyword);
        Ok(())
    }

    /// Stop the active session, if any.
    ///
    /// Safe to call in any state and any number of times: only the call that
    /// finds an active session runs the release sequence, the rest resolve
    /// immediately. Engine stop failures are reported after the engine session
    /// and the audio source have been released anyway.
    pub async fn stop(&self) -> Result<(), SessionError> {
        let shared = &self.shared;
        let _lifecycle = shared.lifecycle.lock().await;

        match shared.begin_stop(None).await {
            Some(session) => shared.release(session).await,
            None => {
                debug!("Stop requested with no active session");
                Ok(())
            }
        }
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state_tx.borrow()
    }

    /// Banner line followed by result texts
    pub fn transcript(&self) -> Vec<String> {
        self.shared.transcript_tx.borrow().clone()
    }

    pub async fn entries(&self) -> Vec<TranscriptEntry> {
        self.shared.inner.lock().await.transcript.entries().to_vec()
    }

    /// Engine-assigned id of the current session, once the keyword was detected
    pub async fn session_id(&self) -> Option<String> {
        self.shared.inner.lock().await.session_id.clone()
    }

    pub async fn stats(&self) -> SessionStats {
        let inner = self.shared.inner.lock().await;
        let until = inner.stopped_at.unwrap_or_else(Utc::now);
        let duration_secs = inner
            .started_at
            .map(|t| until.signed_duration_since(t).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        SessionStats {
            state: inner.state,
            session_id: inner.session_id.clone(),
            started_at: inner.started_at,
            stopped_at: inner.stopped_at,
            duration_secs,
            intermediate_updates: inner.intermediate_updates,
            final_results: inner.final_results,
            discarded_events: inner.discarded_events,
        }
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.shared.state_tx.subscribe()
    }

    pub fn watch_transcript(&self) -> watch::Receiver<Vec<String>> {
        self.shared.transcript_tx.subscribe()
    }
}

impl Shared {
    /// Push transcript and state to watchers; call with the inner lock held.
    ///
    /// The transcript goes first so a state watcher sees the matching lines.
    fn publish(&self, inner: &Inner) {
        let snapshot = inner.transcript.snapshot();
        self.transcript_tx.send_if_modified(|transcript| {
            let changed = *transcript != snapshot;
            if changed {
                *transcript = snapshot;
            }
            changed
        });

        self.state_tx.send_if_modified(|state| {
            let changed = *state != inner.state;
            *state = inner.state;
            changed
        });
    }

    /// Move an active session to `Stopping` and take its resources.
    ///
    /// With `generation` set, only that session is stopped.
    async fn begin_stop(&self, generation: Option<u64>) -> Option<ActiveSession> {
        let mut inner = self.inner.lock().await;
        if !inner.state.is_active() {
            return None;
        }
        if generation.is_some_and(|g| g != inner.generation) {
            return None;
        }

        let session = inner.active.take()?;
        inner.state = SessionState::Stopping;
        self.publish(&inner);
        Some(session)
    }

    async fn release(&self, session: ActiveSession) -> Result<(), SessionError> {
        info!(
            "Stopping keyword session #{} ({} engine)",
            session.generation,
            session.engine.name()
        );

        let stopped = session.engine.stop_keyword_recognition().await;
        if let Err(e) = &stopped {
            error!("Engine failed to stop keyword recognition: {:#}", e);
        }

        self.close_session(session).await;
        self.return_to_idle().await;

        info!("Continuous recognition stopped.");

        stopped.map_err(|e| SessionError::StopFailed(format!("{:#}", e)))
    }

    /// Release the engine session and the audio source, then apply the
    /// notifications the engine queued before it went away. Failures are logged.
    async fn close_session(&self, session: ActiveSession) {
        let ActiveSession {
            generation,
            engine,
            audio,
            consumer,
        } = session;

        if let Err(e) = engine.close().await {
            warn!("Failed to close engine session: {:#}", e);
        }
        drop(engine);

        if let Err(e) = self.audio.close(audio).await {
            warn!("Failed to close audio source: {:#}", e);
        }

        consumer.drain(generation).await;
    }

    async fn return_to_idle(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = SessionState::Idle;
        inner.active = None;
        inner.stopped_at = Some(Utc::now());
        self.publish(&inner);
    }

    /// Tear down `generation` after an engine error, unless it already ended.
    ///
    /// Runs as its own task: the start or stop sequence holding the lifecycle
    /// lock may be waiting for the session's event consumer.
    async fn force_stop(self: Arc<Self>, generation: u64) {
        let _lifecycle = self.lifecycle.lock().await;

        match self.begin_stop(Some(generation)).await {
            Some(session) => {
                warn!("Forcing stop of session #{} after engine error", generation);
                if let Err(e) = self.release(session).await {
                    warn!("Forced stop of session #{}: {}", generation, e);
                }
            }
            None => debug!("Session #{} already stopped", generation),
        }
    }

    /// Single consumer of one session's engine notifications.
    ///
    /// Runs until the channel closes or `drain_rx` fires, in which case the
    /// events still queued are applied first.
    async fn consume_events(
        self: Arc<Self>,
        generation: u64,
        mut events: mpsc::UnboundedReceiver<EngineEvent>,
        mut drain_rx: oneshot::Receiver<()>,
    ) {
        debug!("Event consumer for session #{} started", generation);

        loop {
            tokio::select! {
                biased;
                event = events.recv() => match event {
                    Some(event) => {
                        if !self.dispatch(generation, event).await {
                            break;
                        }
                    }
                    None => break,
                },
                _ = &mut drain_rx => {
                    let mut drained = 0;
                    while let Ok(event) = events.try_recv() {
                        drained += 1;
                        if !self.dispatch(generation, event).await {
                            break;
                        }
                    }
                    debug!("Drained {} queued events for session #{}", drained, generation);
                    break;
                }
            }
        }

        debug!("Event consumer for session #{} finished", generation);
    }

    /// Apply one event; returns false once this session's consumer should end
    async fn dispatch(self: &Arc<Self>, generation: u64, event: EngineEvent) -> bool {
        match self.handle_event(generation, event).await {
            EventOutcome::Continue => true,
            EventOutcome::Finished => false,
            EventOutcome::Fatal(details) => {
                error!("Engine error in session #{}: {}", generation, details);
                tokio::spawn(Arc::clone(self).force_stop(generation));
                true
            }
        }
    }

    async fn handle_event(&self, generation: u64, event: EngineEvent) -> EventOutcome {
        let mut inner = self.inner.lock().await;

        if inner.generation != generation {
            debug!(
                "Discarding {} event from ended session #{}",
                event.kind(),
                generation
            );
            return EventOutcome::Finished;
        }

        let outcome = match event {
            EngineEvent::SessionStarted { session_id } => {
                if session_id.trim().is_empty() {
                    inner.discarded_events += 1;
                    let err = SessionError::EngineNotification(
                        "session started without an id".to_string(),
                    );
                    warn!("{}", err);
                } else {
                    info!("Keyword detected, session started ({})", session_id);
                    inner.session_id = Some(session_id);
                    let banner = inner.config.detected_banner();
                    inner.transcript.set_banner(banner);
                }
                EventOutcome::Continue
            }

            EngineEvent::SessionStopped { session_id } => {
                if inner.session_id.as_deref().is_some_and(|id| id != session_id) {
                    warn!(
                        "{}",
                        SessionError::EngineNotification(format!(
                            "session stopped for unknown session {}",
                            session_id
                        ))
                    );
                } else {
                    info!("Session stopped ({})", session_id);
                }
                EventOutcome::Continue
            }

            EngineEvent::Recognizing { text } => {
                debug!("Intermediate result: {}", text);
                if inner.transcript.update_intermediate(&text) {
                    inner.intermediate_updates += 1;
                }
                EventOutcome::Continue
            }

            EngineEvent::Recognized { text } => {
                info!("Final result: {}", text);
                if inner.transcript.finalize(&text) {
                    inner.final_results += 1;
                    let banner = inner.config.idle_banner();
                    inner.transcript.set_banner(banner);
                }
                EventOutcome::Continue
            }

            EngineEvent::Canceled {
                reason: CancellationReason::EndOfStream,
                details,
            } => {
                info!("Audio source exhausted: {}", details);
                EventOutcome::Continue
            }

            EngineEvent::Canceled {
                reason: CancellationReason::Error,
                details,
            } => EventOutcome::Fatal(details),
        };

        self.publish(&inner);
        outcome
    }
}
