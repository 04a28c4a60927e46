//! Recognition engine interface
//!
//! The engine does the actual keyword spotting and speech recognition. The
//! session controller only drives it through [`RecognitionEngine`] and
//! consumes its notifications from an [`EventSink`].

mod events;
pub mod scripted;

use anyhow::Result;
use std::sync::Arc;

use crate::audio::AudioHandle;
use crate::keyword::KeywordModel;
use crate::session::SessionConfig;

pub use events::{CancellationReason, EngineEvent, EventSink};
pub use scripted::{Script, ScriptedEngine, ScriptedEngineFactory};

/// One engine session bound to an audio source
#[async_trait::async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Request keyword-gated continuous recognition.
    ///
    /// Resolves once the request is accepted, not when the keyword is heard.
    async fn start_keyword_recognition(&self, model: Arc<KeywordModel>) -> Result<()>;

    /// Request the engine stop listening for the keyword
    async fn stop_keyword_recognition(&self) -> Result<()>;

    /// Release the engine session
    async fn close(&self) -> Result<()>;

    /// Engine name for logging
    fn name(&self) -> &str;
}

/// Creates engine sessions; listeners are registered by handing over the sink
#[async_trait::async_trait]
pub trait EngineFactory: Send + Sync {
    async fn create(
        &self,
        config: &SessionConfig,
        audio: &AudioHandle,
        events: EventSink,
    ) -> Result<Arc<dyn RecognitionEngine>>;
}
