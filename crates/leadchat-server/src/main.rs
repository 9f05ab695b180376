#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::sync::Arc;

use anyhow::Context;
use leadchat_ai::{GeminiClient, LlmClient};
use leadchat_server::{AppState, ServerConfig, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,leadchat_server=debug,leadchat_ai=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting leadchat relay server");

    let config = ServerConfig::load()?;

    let mut gemini = GeminiClient::new(config.provider.api_key.clone())
        .context("Failed to build Gemini client")?
        .with_model(config.provider.model.clone());
    if let Some(base_url) = &config.provider.base_url {
        gemini = gemini.with_base_url(base_url.clone());
    }
    let llm: Arc<dyn LlmClient> = Arc::new(gemini);

    tracing::info!(model = llm.model(), provider = llm.provider(), "Model provider ready");

    let state = AppState::new(llm)
        .with_temperature(config.provider.temperature)
        .with_max_output_tokens(config.provider.max_output_tokens);
    let app = router(state, &config.allowed_origins);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {address}"))?;

    tracing::info!("leadchat relay listening on http://{address}");

    axum::serve(listener, app)
        .await
        .context("Relay server stopped unexpectedly")
}
