//! leadchat relay server - forwards chat transcripts to the model provider
//! and streams the reply back as plain text.

pub mod api;
pub mod config;
pub mod persona;

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use leadchat_contracts::CHAT_ENDPOINT;
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub use api::{ApiError, AppState};
pub use config::ServerConfig;

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the relay router. An empty `allowed_origins` accepts any origin.
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(CHAT_ENDPOINT, post(api::chat::relay_chat))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use leadchat_ai::{MockLlmClient, MockReply};
    use tower::ServiceExt;

    use super::*;

    fn state() -> AppState {
        AppState::new(Arc::new(MockLlmClient::from_replies(
            "mock",
            vec![MockReply::chunks(["Hi"])],
        )))
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = router(state(), &[])
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn configured_origin_is_echoed_on_preflight() {
        let origins = vec!["https://aicorelab.dev".to_string()];
        let response = router(state(), &origins)
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri(CHAT_ENDPOINT)
                    .header(header::ORIGIN, "https://aicorelab.dev")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://aicorelab.dev"
        );
    }

    #[tokio::test]
    async fn chat_route_is_mounted() {
        let response = router(state(), &[])
            .oneshot(
                Request::post(CHAT_ENDPOINT)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"messages":[{"role":"user","content":"yo"}]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Hi");
    }
}
