//! LLM module - streaming provider abstraction

mod client;
mod gemini;
#[cfg(any(test, feature = "test-utils"))]
mod mock_client;
mod sse;

pub use client::{
    ChunkStream, CompletionRequest, FinishReason, LlmClient, Message, Role, StreamChunk,
    TokenUsage,
};
pub use gemini::GeminiClient;
#[cfg(any(test, feature = "test-utils"))]
pub use mock_client::{MockLlmClient, MockReply};
