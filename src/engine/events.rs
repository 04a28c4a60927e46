use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Why the engine canceled recognition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    /// The audio source ran out; the session can still be stopped normally
    EndOfStream,
    /// Unrecoverable engine failure; the session is torn down
    Error,
}

/// Notification delivered by a recognition engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// The keyword was detected and a recognition session began
    SessionStarted { session_id: String },
    SessionStopped { session_id: String },
    /// Intermediate (revisable) hypothesis
    Recognizing { text: String },
    /// Final result for one utterance
    Recognized { text: String },
    Canceled {
        reason: CancellationReason,
        details: String,
    },
}

impl EngineEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::SessionStarted { .. } => "session_started",
            EngineEvent::SessionStopped { .. } => "session_stopped",
            EngineEvent::Recognizing { .. } => "recognizing",
            EngineEvent::Recognized { .. } => "recognized",
            EngineEvent::Canceled { .. } => "canceled",
        }
    }
}

/// Listener handle given to an engine at creation.
///
/// Sending never blocks, so it is safe to call from engine-owned threads.
/// Events are queued in delivery order for the session's single consumer.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, event: EngineEvent) {
        let kind = event.kind();
        if self.tx.send(event).is_err() {
            debug!("Dropping {} event: session consumer is gone", kind);
        }
    }

    pub fn session_started(&self, session_id: impl Into<String>) {
        self.send(EngineEvent::SessionStarted {
            session_id: session_id.into(),
        });
    }

    pub fn session_stopped(&self, session_id: impl Into<String>) {
        self.send(EngineEvent::SessionStopped {
            session_id: session_id.into(),
        });
    }

    pub fn recognizing(&self, text: impl Into<String>) {
        self.send(EngineEvent::Recognizing { text: text.into() });
    }

    pub fn recognized(&self, text: impl Into<String>) {
        self.send(EngineEvent::Recognized { text: text.into() });
    }

    pub fn canceled(&self, reason: CancellationReason, details: impl Into<String>) {
        self.send(EngineEvent::Canceled {
            reason,
            details: details.into(),
        });
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
