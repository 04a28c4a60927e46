use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::SessionState;

/// Statistics about the current (or last) session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Controller state at the time of the snapshot
    pub state: SessionState,

    /// Engine-assigned session id, once the keyword was detected
    pub session_id: Option<String>,

    /// When `start` was called
    pub started_at: Option<DateTime<Utc>>,

    /// When the session returned to idle
    pub stopped_at: Option<DateTime<Utc>>,

    /// Time from `start` until the session stopped (or until now) in seconds
    pub duration_secs: f64,

    /// Number of intermediate results applied to the transcript
    pub intermediate_updates: usize,

    /// Number of final results applied to the transcript
    pub final_results: usize,

    /// Number of malformed notifications this session dropped
    pub discarded_events: usize,
}
