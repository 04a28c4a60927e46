use thiserror::Error;

/// Errors surfaced by the session controller.
///
/// Collaborator failures (audio, keyword model, engine) arrive as `anyhow`
/// errors and are flattened into the variant's message, keeping the full
/// context chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// `start` was called while a session is active
    #[error("Session already started (state: {0})")]
    AlreadyStarted(String),

    /// Audio source, keyword model, or engine session could not be opened
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// The engine rejected the keyword recognition start request
    #[error("Failed to start keyword recognition: {0}")]
    StartFailed(String),

    /// The engine failed to stop keyword recognition
    #[error("Failed to stop keyword recognition: {0}")]
    StopFailed(String),

    /// Malformed or unexpected engine notification; logged, never propagated
    #[error("Unexpected engine notification: {0}")]
    EngineNotification(String),
}

impl SessionError {
    pub(crate) fn resource(what: &str, err: &anyhow::Error) -> Self {
        SessionError::ResourceUnavailable(format!("{}: {:#}", what, err))
    }
}
