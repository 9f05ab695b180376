use async_stream::stream;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use leadchat_ai::{CompletionRequest, Message};
use leadchat_contracts::{ChatMessage, ChatRole};
use serde_json::Value;

use super::{ApiError, AppState};

const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

// POST /api/chat
pub async fn relay_chat(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let messages = parse_messages(&body)?;
    let turn_count = messages.len();

    let mut request = CompletionRequest::new(messages.into_iter().map(to_llm_message).collect())
        .with_system(state.system_prompt.as_ref());
    if let Some(temperature) = state.temperature {
        request = request.with_temperature(temperature);
    }
    if let Some(tokens) = state.max_output_tokens {
        request = request.with_max_tokens(tokens);
    }

    let mut upstream = state.llm.complete_stream(request).await?;

    // The status line is only committed once the provider has produced
    // something; an immediate failure still gets a JSON error response.
    let first = match upstream.next().await {
        Some(Ok(chunk)) => Some(chunk),
        Some(Err(err)) => return Err(err.into()),
        None => None,
    };

    tracing::debug!(
        turns = turn_count,
        model = state.llm.model(),
        "Relaying chat completion"
    );

    let text = stream! {
        if let Some(chunk) = first.filter(|chunk| !chunk.text.is_empty()) {
            yield Ok::<_, std::io::Error>(Bytes::from(chunk.text));
        }

        while let Some(item) = upstream.next().await {
            match item {
                Ok(chunk) => {
                    if !chunk.text.is_empty() {
                        yield Ok(Bytes::from(chunk.text));
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Provider stream failed mid-reply; truncating");
                    break;
                }
            }
        }
    };

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, TEXT_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(text),
    )
        .into_response())
}

/// Accepts only an object whose `messages` is a non-empty array. Every other
/// shape (empty body, `null`, a string or object `messages`) is "no messages".
fn parse_messages(body: &[u8]) -> Result<Vec<ChatMessage>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::NoMessages);
    }

    let Value::Object(mut request) = serde_json::from_slice::<Value>(body)? else {
        return Err(ApiError::NoMessages);
    };
    let Some(Value::Array(items)) = request.remove("messages") else {
        return Err(ApiError::NoMessages);
    };
    if items.is_empty() {
        return Err(ApiError::NoMessages);
    }

    Ok(serde_json::from_value(Value::Array(items))?)
}

fn to_llm_message(message: ChatMessage) -> Message {
    match message.role {
        ChatRole::User => Message::user(message.content),
        ChatRole::Assistant => Message::assistant(message.content),
    }
}
