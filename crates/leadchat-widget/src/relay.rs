//! Transport between the widget and the relay endpoint.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use leadchat_contracts::{CHAT_ENDPOINT, ChatRequest, ErrorBody};
use reqwest::Client;
use thiserror::Error;

/// Raw reply bytes in arrival order.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, RelayError>> + Send>>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelayError {
    /// Network failure or a broken connection.
    #[error("relay transport failed: {0}")]
    Transport(String),

    /// The relay answered with a non-success status.
    #[error("relay returned {status}: {error}")]
    Status { status: u16, error: String },
}

/// Opens one streamed reply for a transcript snapshot.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, RelayError>;
}

/// Posts transcripts to `{base_url}/api/chat` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRelay {
    client: Client,
    endpoint: String,
}

impl HttpRelay {
    pub fn new(base_url: &str) -> Result<Self, RelayError> {
        Ok(Self::with_client(build_http_client()?, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), CHAT_ENDPOINT),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn build_http_client() -> Result<Client, RelayError> {
    let mut builder = Client::builder();
    if leadchat_contracts::system_proxy_disabled() || cfg!(test) {
        builder = builder.no_proxy();
    }
    builder
        .build()
        .map_err(|err| RelayError::Transport(err.to_string()))
}

#[async_trait]
impl RelayTransport for HttpRelay {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, RelayError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|err| RelayError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(parsed) => parsed.error,
                Err(_) if body.trim().is_empty() => status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string(),
                Err(_) => body,
            };
            return Err(RelayError::Status {
                status: status.as_u16(),
                error,
            });
        }

        Ok(Box::pin(
            response
                .bytes_stream()
                .map_err(|err| RelayError::Transport(err.to_string())),
        ))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::channel::mpsc;
    use parking_lot::Mutex;

    use super::*;

    enum Scripted {
        Fail(RelayError),
        Stream(ByteStream),
    }

    /// Transport that plays back queued replies and records every request.
    #[derive(Default)]
    pub(crate) struct ScriptedRelay {
        script: Mutex<VecDeque<Scripted>>,
        opens: AtomicUsize,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedRelay {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn push_chunks<I>(&self, chunks: I)
        where
            I: IntoIterator<Item = Result<&'static [u8], RelayError>>,
        {
            let items: Vec<Result<Bytes, RelayError>> = chunks
                .into_iter()
                .map(|item| item.map(Bytes::from_static))
                .collect();
            self.script
                .lock()
                .push_back(Scripted::Stream(Box::pin(futures::stream::iter(items))));
        }

        /// Queue a reply whose chunks are fed by hand; the stream ends when
        /// the returned sender is dropped.
        pub(crate) fn push_channel(&self) -> mpsc::UnboundedSender<Result<Bytes, RelayError>> {
            let (tx, rx) = mpsc::unbounded();
            self.script.lock().push_back(Scripted::Stream(Box::pin(rx)));
            tx
        }

        pub(crate) fn push_failure(&self, error: RelayError) {
            self.script.lock().push_back(Scripted::Fail(error));
        }

        pub(crate) fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }

        pub(crate) fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl RelayTransport for ScriptedRelay {
        async fn open(&self, request: &ChatRequest) -> Result<ByteStream, RelayError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().push(request.clone());
            match self.script.lock().pop_front() {
                Some(Scripted::Stream(stream)) => Ok(stream),
                Some(Scripted::Fail(error)) => Err(error),
                None => Err(RelayError::Transport("no scripted reply".to_string())),
            }
        }
    }
}
