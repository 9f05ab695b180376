use leadchat_ai::LlmClient;
use std::sync::Arc;

use crate::persona::SYSTEM_PROMPT;

/// Immutable state shared by every request. Handlers never mutate it, so
/// concurrent requests stay fully isolated.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn LlmClient>,
    pub system_prompt: Arc<str>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl AppState {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            system_prompt: Arc::from(SYSTEM_PROMPT),
            temperature: Some(0.7),
            max_output_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: Option<u32>) -> Self {
        self.max_output_tokens = tokens;
        self
    }
}
