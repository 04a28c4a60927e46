pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod keyword;
pub mod session;

pub use audio::{AudioDescriptor, AudioFile, AudioHandle, AudioProvider, FileAudioProvider};
pub use config::Config;
pub use engine::{
    CancellationReason, EngineEvent, EngineFactory, EventSink, RecognitionEngine, Script,
    ScriptedEngine, ScriptedEngineFactory,
};
pub use error::SessionError;
pub use keyword::{FileKeywordModelLoader, KeywordModel, KeywordModelLoader};
pub use session::{
    load_keyword_model, SessionConfig, SessionController, SessionState, SessionStats, Transcript,
    TranscriptEntry,
};
