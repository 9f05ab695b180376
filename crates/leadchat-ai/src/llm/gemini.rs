//! Google Gemini LLM provider (Generative Language API, SSE streaming)

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AiError, Result};
use crate::http_client::{build_http_client, response_to_error};
use crate::llm::client::{
    ChunkStream, CompletionRequest, FinishReason, LlmClient, Role, StreamChunk, TokenUsage,
};
use crate::llm::sse::SseBuffer;

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at a different API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    fn build_body(request: CompletionRequest) -> GeminiRequest {
        let contents = request
            .messages
            .into_iter()
            .map(|m| GeminiContent {
                role: Some(
                    match m.role {
                        Role::User => "user",
                        Role::Assistant => "model",
                    }
                    .to_string(),
                ),
                parts: vec![GeminiPart { text: m.content }],
            })
            .collect();

        let generation_config = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            })
        } else {
            None
        };

        GeminiRequest {
            system_instruction: request.system.map(|text| GeminiContent {
                role: None,
                parts: vec![GeminiPart { text }],
            }),
            contents,
            generation_config,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

// Streaming response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamEvent {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
    #[serde(default)]
    error: Option<GeminiErrorPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiCandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorPayload {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

/// What a single SSE event contributes to the chunk stream.
enum EventOutcome {
    Text(String),
    Finished(FinishReason, Option<TokenUsage>),
    Failed(AiError),
}

fn parse_event(data: &str) -> Vec<EventOutcome> {
    let event: GeminiStreamEvent = match serde_json::from_str(data) {
        Ok(event) => event,
        Err(e) => {
            return vec![EventOutcome::Failed(AiError::InvalidFormat(format!(
                "Unparseable Gemini stream event: {e}"
            )))];
        }
    };

    if let Some(error) = event.error {
        let code = error.code.map(|c| format!(" ({c})")).unwrap_or_default();
        return vec![EventOutcome::Failed(AiError::Llm(format!(
            "Gemini stream error{code}: {}",
            error.message
        )))];
    }

    let Some(candidate) = event.candidates.into_iter().next() else {
        return Vec::new();
    };

    let mut outcomes = Vec::new();

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();
    if !text.is_empty() {
        outcomes.push(EventOutcome::Text(text));
    }

    // The last event usually carries both the final text and the finish reason.
    if let Some(reason) = candidate.finish_reason {
        outcomes.push(EventOutcome::Finished(
            FinishReason::from_provider(&reason),
            event.usage_metadata.map(TokenUsage::from),
        ));
    }

    outcomes
}

impl From<GeminiUsage> for TokenUsage {
    fn from(usage: GeminiUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_token_count,
            completion_tokens: usage.candidates_token_count,
            total_tokens: usage.total_token_count,
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn provider(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<ChunkStream> {
        let body = Self::build_body(request);

        let response = self
            .client
            .post(self.stream_url())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(response_to_error(response, "Gemini").await);
        }

        let model = self.model.clone();
        let mut byte_stream = response.bytes_stream();

        Ok(Box::pin(async_stream::stream! {
            let mut buffer = SseBuffer::default();
            let mut eof = false;
            let mut finished = false;

            loop {
                let data = if let Some(data) = buffer.next_data() {
                    data
                } else if eof {
                    match buffer.finish() {
                        Some(data) => data,
                        None => break,
                    }
                } else {
                    match byte_stream.next().await {
                        Some(Ok(bytes)) => buffer.push(&bytes),
                        Some(Err(e)) => {
                            yield Err(AiError::Llm(format!("Stream error: {}", e)));
                            return;
                        }
                        None => eof = true,
                    }
                    continue;
                };

                for outcome in parse_event(&data) {
                    match outcome {
                        EventOutcome::Text(text) => yield Ok(StreamChunk::text(text)),
                        EventOutcome::Finished(reason, usage) => {
                            if let Some(usage) = &usage {
                                debug!(
                                    model = %model,
                                    prompt_tokens = usage.prompt_tokens,
                                    completion_tokens = usage.completion_tokens,
                                    "Gemini stream finished"
                                );
                            }
                            finished = true;
                            yield Ok(StreamChunk::final_chunk(reason, usage));
                        }
                        EventOutcome::Failed(err) => {
                            yield Err(err);
                            return;
                        }
                    }
                }
            }

            if !finished {
                debug!(model = %model, "Gemini stream closed without a finish reason");
            }
        }))
    }
}
