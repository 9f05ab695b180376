//! Ordered chat history owned by the widget.

use leadchat_contracts::{ChatMessage, ChatRole};
use uuid::Uuid;

/// Identifier of the greeting entry every transcript starts with.
pub const WELCOME_ID: &str = "welcome";

/// One rendered transcript entry. `id` is stable for the entry's lifetime,
/// which lets a streamed reply overwrite its own placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new(welcome: impl Into<String>) -> Self {
        Self {
            entries: vec![TranscriptEntry {
                id: WELCOME_ID.to_string(),
                role: ChatRole::Assistant,
                content: welcome.into(),
            }],
        }
    }

    /// Append an entry and return a copy of it.
    pub fn push(&mut self, role: ChatRole, content: impl Into<String>) -> TranscriptEntry {
        let entry = TranscriptEntry {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
        };
        self.entries.push(entry.clone());
        entry
    }

    /// Replace the whole content of an entry. Returns false for unknown ids.
    pub fn set_content(&mut self, id: &str, content: impl Into<String>) -> bool {
        match self.entries.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.content = content.into();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&TranscriptEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn messages(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Snapshot sent to the relay. Assistant entries still waiting for
    /// their first chunk carry no content and are left out.
    pub fn to_wire(&self) -> Vec<ChatMessage> {
        self.entries
            .iter()
            .filter(|entry| !(entry.role == ChatRole::Assistant && entry.content.is_empty()))
            .map(|entry| ChatMessage {
                role: entry.role,
                content: entry.content.clone(),
            })
            .collect()
    }
}
