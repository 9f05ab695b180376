use reqwest::{Client, Response};

use crate::error::{AiError, Result};

// Provider error bodies can be large or echo request data back.
const MAX_ERROR_BODY: usize = 512;

pub(crate) fn build_http_client() -> Result<Client> {
    let builder = Client::builder();
    let builder = if should_disable_system_proxy() {
        builder.no_proxy()
    } else {
        builder
    };
    Ok(builder.build()?)
}

fn should_disable_system_proxy() -> bool {
    leadchat_contracts::system_proxy_disabled() || cfg!(test)
}

pub(crate) async fn response_to_error(response: Response, provider: &str) -> AiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let message = if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated]", &body[..end])
    } else {
        body
    };

    AiError::LlmHttp {
        provider: provider.to_string(),
        status,
        message,
    }
}
