//! Deterministic mock LLM client for relay and widget tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_stream::stream;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::{Duration, sleep};

use crate::error::{AiError, Result};

use super::{ChunkStream, CompletionRequest, FinishReason, LlmClient, Role, StreamChunk};

/// Scripted outcome of one `complete_stream` call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Stream these text chunks, then finish normally.
    Chunks(Vec<String>),
    /// Refuse the call before any stream exists.
    OpenError(String),
    /// Stream these chunks, then fail with an error item.
    FailAfter { chunks: Vec<String>, message: String },
    /// Stream whatever the paired sender pushes; finish when it is dropped.
    Live(Arc<Mutex<Option<UnboundedReceiver<String>>>>),
}

impl MockReply {
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Chunks(chunks.into_iter().map(Into::into).collect())
    }

    pub fn open_error(message: impl Into<String>) -> Self {
        Self::OpenError(message.into())
    }

    pub fn fail_after<I, S>(chunks: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::FailAfter {
            chunks: chunks.into_iter().map(Into::into).collect(),
            message: message.into(),
        }
    }

    /// A reply fed chunk by chunk from the test, so it can observe the
    /// consumer while the provider stream is still open.
    pub fn live() -> (Self, UnboundedSender<String>) {
        let (tx, rx) = unbounded_channel();
        (Self::Live(Arc::new(Mutex::new(Some(rx)))), tx)
    }
}

/// A deterministic mock LLM client driven by scripted replies.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    model: String,
    script: Arc<Mutex<VecDeque<MockReply>>>,
    chunk_delay_ms: u64,
    calls: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<CompletionRequest>>>,
}

impl MockLlmClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn from_replies(model: impl Into<String>, replies: Vec<MockReply>) -> Self {
        Self {
            model: model.into(),
            script: Arc::new(Mutex::new(VecDeque::from(replies))),
            ..Default::default()
        }
    }

    /// Pause before every streamed chunk.
    pub fn with_chunk_delay(mut self, delay_ms: u64) -> Self {
        self.chunk_delay_ms = delay_ms;
        self
    }

    pub async fn push_reply(&self, reply: MockReply) {
        self.script.lock().await.push_back(reply);
    }

    /// Number of `complete_stream` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().await.clone()
    }

    fn fallback_reply(request: &CompletionRequest) -> MockReply {
        let text = request
            .messages
            .iter()
            .rev()
            .find(|msg| msg.role == Role::User)
            .map(|msg| format!("mock-echo: {}", msg.content))
            .unwrap_or_else(|| "mock-ok".to_string());
        MockReply::Chunks(vec![text])
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<ChunkStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.script.lock().await.pop_front();
        let reply = reply.unwrap_or_else(|| Self::fallback_reply(&request));
        *self.last_request.lock().await = Some(request);

        let (chunks, failure) = match reply {
            MockReply::OpenError(message) => return Err(AiError::Llm(message)),
            MockReply::Chunks(chunks) => (chunks, None),
            MockReply::FailAfter { chunks, message } => (chunks, Some(message)),
            MockReply::Live(feed) => {
                let mut feed = feed
                    .lock()
                    .await
                    .take()
                    .ok_or_else(|| AiError::Llm("live reply already consumed".to_string()))?;
                return Ok(Box::pin(stream! {
                    while let Some(chunk) = feed.recv().await {
                        yield Ok(StreamChunk::text(chunk));
                    }
                    yield Ok(StreamChunk::final_chunk(FinishReason::Stop, None));
                }));
            }
        };
        let delay = self.chunk_delay_ms;

        Ok(Box::pin(stream! {
            for chunk in chunks {
                if delay > 0 {
                    sleep(Duration::from_millis(delay)).await;
                }
                yield Ok(StreamChunk::text(chunk));
            }

            match failure {
                Some(message) => yield Err(AiError::Llm(message)),
                None => yield Ok(StreamChunk::final_chunk(FinishReason::Stop, None)),
            }
        }))
    }
}
