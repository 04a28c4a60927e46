use serde::{Deserialize, Serialize};
use std::fmt;

/// Controller lifecycle: `Idle -> Starting -> Listening -> Stopping -> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session; initial and terminal state
    Idle,
    /// Resources opened, start request in flight
    Starting,
    /// Engine accepted the start request and is listening for the keyword
    Listening,
    /// Stop requested, resources being released
    Stopping,
}

impl SessionState {
    /// Whether a session owns resources in this state
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Starting | SessionState::Listening)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Listening => "listening",
            SessionState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}
