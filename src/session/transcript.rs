use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recognized utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Sequence index, starting at 1 (0 is the banner line)
    pub index: usize,

    /// Latest text; changes until the entry is final
    pub text: String,

    /// Whether the engine will no longer revise this entry
    pub is_final: bool,

    /// When the text was last replaced
    pub updated_at: DateTime<Utc>,
}

/// Banner line followed by recognition results in recognition order.
///
/// At most one entry is open (non-final) and it is always the last one.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    banner: String,
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to a single empty banner line
    pub fn reset(&mut self) {
        self.banner.clear();
        self.entries.clear();
    }

    pub fn set_banner(&mut self, banner: impl Into<String>) {
        self.banner = banner.into();
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// The open tail entry, if any
    pub fn open_entry(&self) -> Option<&TranscriptEntry> {
        self.entries.last().filter(|e| !e.is_final)
    }

    /// Replace the open entry's text, opening a new slot if needed.
    ///
    /// Returns false (and changes nothing) for empty text.
    pub fn update_intermediate(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        self.open_slot().text = text.to_string();
        true
    }

    /// Finalize the open entry with `text`, or append a final entry if none is open.
    ///
    /// Returns false (and changes nothing) for empty text.
    pub fn finalize(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let entry = self.open_slot();
        entry.text = text.to_string();
        entry.is_final = true;
        true
    }

    /// Banner plus entry texts, in display order
    pub fn snapshot(&self) -> Vec<String> {
        std::iter::once(self.banner.clone())
            .chain(self.entries.iter().map(|e| e.text.clone()))
            .collect()
    }

    /// Number of lines including the banner
    pub fn len(&self) -> usize {
        self.entries.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.banner.is_empty()
    }

    fn open_slot(&mut self) -> &mut TranscriptEntry {
        let needs_slot = self.entries.last().map_or(true, |e| e.is_final);
        if needs_slot {
            let index = self.entries.len() + 1;
            self.entries.push(TranscriptEntry {
                index,
                text: String::new(),
                is_final: false,
                updated_at: Utc::now(),
            });
        }
        let tail = self.entries.len() - 1;
        let entry = &mut self.entries[tail];
        entry.updated_at = Utc::now();
        entry
    }
}
