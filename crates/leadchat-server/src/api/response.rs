use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use leadchat_ai::AiError;
use leadchat_contracts::ErrorBody;
use thiserror::Error;

/// Failures the relay reports before any part of a reply has been streamed.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The body is not JSON or a message does not decode. Reported to the
    /// caller exactly like a missing transcript.
    #[error("request body is not a valid transcript: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("request contains no messages")]
    NoMessages,

    #[error("model provider failed: {0}")]
    Upstream(#[from] AiError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Malformed(_) | Self::NoMessages => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            Self::Malformed(_) | Self::NoMessages => ErrorBody::no_messages(),
            Self::Upstream(_) => ErrorBody::processing_failed(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Upstream(err) => tracing::error!(error = %err, "Chat relay failed before streaming"),
            other => tracing::debug!(error = %other, "Rejected chat request"),
        }
        (self.status(), Json(self.body())).into_response()
    }
}
