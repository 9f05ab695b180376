//! leadchat AI - streaming access to hosted text-generation models
//!
//! This crate provides:
//! - The [`LlmClient`] capability: system instruction + ordered messages in,
//!   incremental text out
//! - A Google Gemini client speaking the `streamGenerateContent` SSE API
//! - A scripted mock client for tests (feature `test-utils`)

pub mod error;
mod http_client;
pub mod llm;

// Re-export commonly used types
pub use error::{AiError, Result};
#[cfg(any(test, feature = "test-utils"))]
pub use llm::{MockLlmClient, MockReply};
pub use llm::{
    ChunkStream, CompletionRequest, FinishReason, GeminiClient, LlmClient, Message, Role,
    StreamChunk, TokenUsage,
};
