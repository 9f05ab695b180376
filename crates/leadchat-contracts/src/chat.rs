use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Path of the relay endpoint.
pub const CHAT_ENDPOINT: &str = "/api/chat";

/// Name of the application-wide signal that opens the chat panel.
pub const CHAT_OPEN_EVENT: &str = "chat:open";

/// Author of a transcript entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ChatRole {
    User,
    Assistant,
}

/// One transcript entry as it travels over the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Body of `POST /api/chat`. The whole transcript is sent on every turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages: Some(messages),
        }
    }
}

/// JSON body returned with every non-streaming failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub const NO_MESSAGES: &'static str = "No messages provided";
    pub const PROCESSING_FAILED: &'static str = "Failed to process message";

    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    pub fn no_messages() -> Self {
        Self::new(Self::NO_MESSAGES)
    }

    pub fn processing_failed() -> Self {
        Self::new(Self::PROCESSING_FAILED)
    }
}

/// Payload of the [`CHAT_OPEN_EVENT`] signal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export)]
pub struct ChatOpenDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl ChatOpenDetail {
    pub fn with_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
        }
    }

    /// The preset prompt, if one is present and not blank.
    pub fn preset_prompt(&self) -> Option<&str> {
        self.prompt
            .as_deref()
            .map(str::trim)
            .filter(|prompt| !prompt.is_empty())
    }
}
