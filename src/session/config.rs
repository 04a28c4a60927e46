use serde::{Deserialize, Serialize};

/// Configuration for one keyword-gated recognition session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Spoken trigger phrase (e.g., "computer")
    pub keyword: String,

    /// Recognition language passed to the engine
    /// Default: "en-US"
    pub language: String,
}

impl SessionConfig {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            ..Self::default()
        }
    }

    /// Banner shown while waiting for the keyword
    pub fn idle_banner(&self) -> String {
        format!("say `{}`...", self.keyword)
    }

    /// Banner shown once the engine reports the keyword
    pub fn detected_banner(&self) -> String {
        format!("KeywordModel `{}` detected", self.keyword)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keyword: "computer".to_string(),
            language: "en-US".to_string(),
        }
    }
}
