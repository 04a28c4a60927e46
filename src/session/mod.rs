//! Keyword-gated recognition session management
//!
//! This module provides the `SessionController` that manages:
//! - Opening and releasing the session's audio source and engine session
//! - Keyword recognition start/stop requests
//! - Engine notification handling and transcript collection
//! - Session statistics and state management

mod config;
mod controller;
mod state;
mod stats;
mod transcript;

pub use config::SessionConfig;
pub use controller::{load_keyword_model, SessionController};
pub use state::SessionState;
pub use stats::SessionStats;
pub use transcript::{Transcript, TranscriptEntry};
