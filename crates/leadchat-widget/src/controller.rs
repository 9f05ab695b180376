//! Request/stream cycle for one chat panel.
//!
//! A send moves the panel through `Idle -> Sending -> Streaming -> Idle`, or
//! `Idle -> Sending -> Error -> Idle` when the relay cannot be reached. At
//! most one send runs at a time; a second one is rejected, not queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use leadchat_contracts::{ChatRequest, ChatRole, LeadProfile};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::decoder::Utf8StreamDecoder;
use crate::events::WidgetEvent;
use crate::lead::LeadCapture;
use crate::relay::RelayTransport;
use crate::transcript::{Transcript, TranscriptEntry};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Sending,
    Streaming,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Nothing left after trimming.
    Empty,
    /// Another send is still in flight.
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Rejected(RejectReason),
    /// The reply streamed to its natural end.
    Completed,
    /// The stream broke after opening; whatever arrived is kept.
    Truncated,
    /// The relay could not be reached; the fallback message was shown.
    Failed,
    /// Stopped by [`ChatController::cancel`].
    Cancelled,
}

pub struct ChatController {
    transport: Arc<dyn RelayTransport>,
    transcript: Mutex<Transcript>,
    phase: Mutex<Phase>,
    in_flight: AtomicBool,
    cancel: Mutex<Option<broadcast::Sender<()>>>,
    events: broadcast::Sender<WidgetEvent>,
    fallback_message: String,
    lead: Option<LeadCapture>,
}

/// Restores the idle state when a send finishes or its future is dropped.
struct InFlightGuard<'a> {
    controller: &'a ChatController,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.controller.cancel.lock().take();
        self.controller.set_phase(Phase::Idle);
        self.controller.in_flight.store(false, Ordering::Release);
    }
}

impl ChatController {
    pub fn new(
        transport: Arc<dyn RelayTransport>,
        welcome: impl Into<String>,
        fallback_message: impl Into<String>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            transport,
            transcript: Mutex::new(Transcript::new(welcome)),
            phase: Mutex::new(Phase::Idle),
            in_flight: AtomicBool::new(false),
            cancel: Mutex::new(None),
            events,
            fallback_message: fallback_message.into(),
            lead: None,
        }
    }

    /// Record every accepted user message into a lead wizard.
    pub fn with_lead_capture(mut self, capture: LeadCapture) -> Self {
        self.lead = Some(capture);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.events.subscribe()
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn messages(&self) -> Vec<TranscriptEntry> {
        self.transcript.lock().messages().to_vec()
    }

    pub fn lead_capture(&self) -> Option<&LeadCapture> {
        self.lead.as_ref()
    }

    /// Stop reading the in-flight reply, keeping the text received so far.
    pub fn cancel(&self) {
        if let Some(cancel) = self.cancel.lock().as_ref() {
            let _ = cancel.send(());
        }
    }

    pub async fn send(&self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Rejected(RejectReason::Empty);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Send ignored while a reply is in flight");
            return SendOutcome::Rejected(RejectReason::Busy);
        }

        let (cancel_tx, mut cancel_rx) = broadcast::channel(1);
        *self.cancel.lock() = Some(cancel_tx);
        let _guard = InFlightGuard { controller: self };

        self.append(ChatRole::User, text);
        if let Some(lead) = &self.lead
            && let Some(profile) = lead.record(text)
        {
            lead.submit(&profile).await;
        }

        self.set_phase(Phase::Sending);
        let request = ChatRequest::new(self.transcript.lock().to_wire());

        let opened = tokio::select! {
            biased;
            _ = cancel_rx.recv() => return SendOutcome::Cancelled,
            opened = self.transport.open(&request) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to reach chat relay");
                self.append(ChatRole::Assistant, self.fallback_message.clone());
                self.set_phase(Phase::Error);
                return SendOutcome::Failed;
            }
        };

        let placeholder = self.append(ChatRole::Assistant, String::new());
        self.set_phase(Phase::Streaming);

        let mut decoder = Utf8StreamDecoder::new();
        let mut reply = String::new();
        let outcome = loop {
            let item = tokio::select! {
                biased;
                _ = cancel_rx.recv() => break SendOutcome::Cancelled,
                item = stream.next() => item,
            };
            match item {
                Some(Ok(bytes)) => {
                    let delta = decoder.decode(&bytes);
                    if !delta.is_empty() {
                        reply.push_str(&delta);
                        self.update(&placeholder.id, &reply);
                    }
                }
                Some(Err(err)) => {
                    tracing::warn!(error = %err, received = reply.len(), "Reply stream broke");
                    break SendOutcome::Truncated;
                }
                None => break SendOutcome::Completed,
            }
        };

        let tail = decoder.finish();
        if !tail.is_empty() {
            reply.push_str(&tail);
            self.update(&placeholder.id, &reply);
        }
        if outcome == SendOutcome::Truncated && reply.is_empty() {
            self.update(&placeholder.id, &self.fallback_message);
        }

        outcome
    }

    pub(crate) fn emit(&self, event: WidgetEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn append(&self, role: ChatRole, content: impl Into<String>) -> TranscriptEntry {
        let entry = self.transcript.lock().push(role, content);
        self.emit(WidgetEvent::MessageAppended(entry.clone()));
        entry
    }

    fn update(&self, id: &str, content: &str) {
        if self.transcript.lock().set_content(id, content) {
            self.emit(WidgetEvent::MessageUpdated {
                id: id.to_string(),
                content: content.to_string(),
            });
        }
    }

    fn set_phase(&self, phase: Phase) {
        let changed = {
            let mut current = self.phase.lock();
            let changed = *current != phase;
            *current = phase;
            changed
        };
        if changed {
            self.emit(WidgetEvent::PhaseChanged(phase));
        }
    }

    /// Lead profile collected so far in guided mode.
    pub fn lead_profile(&self) -> Option<LeadProfile> {
        self.lead
            .as_ref()
            .map(|lead| lead.wizard().profile().clone())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use leadchat_contracts::ChatMessage;

    use super::*;
    use crate::config::FALLBACK_MESSAGE;
    use crate::lead::LeadSink;
    use crate::relay::RelayError;
    use crate::relay::testing::ScriptedRelay;

    fn controller(relay: &Arc<ScriptedRelay>) -> Arc<ChatController> {
        Arc::new(ChatController::new(
            relay.clone(),
            "Welcome!",
            FALLBACK_MESSAGE,
        ))
    }

    fn drain(rx: &mut broadcast::Receiver<WidgetEvent>) -> Vec<WidgetEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn phases(events: &[WidgetEvent]) -> Vec<Phase> {
        events
            .iter()
            .filter_map(|event| match event {
                WidgetEvent::PhaseChanged(phase) => Some(*phase),
                _ => None,
            })
            .collect()
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        let relay = Arc::new(ScriptedRelay::new());
        let chat = controller(&relay);

        assert_eq!(
            chat.send("   \n").await,
            SendOutcome::Rejected(RejectReason::Empty)
        );
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(relay.opens(), 0);
    }

    #[tokio::test]
    async fn chunks_fill_placeholder_in_order() {
        let relay = Arc::new(ScriptedRelay::new());
        // "Hé" then "llo!" with the two bytes of "é" split across chunks.
        relay.push_chunks([Ok(&b"H\xC3"[..]), Ok(&b"\xA9"[..]), Ok(&b"llo!"[..])]);
        let chat = controller(&relay);
        let mut rx = chat.subscribe();

        assert_eq!(chat.send("  Hi  ").await, SendOutcome::Completed);

        let messages = chat.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, ChatRole::User);
        assert_eq!(messages[1].content, "Hi");
        assert_eq!(messages[2].role, ChatRole::Assistant);
        assert_eq!(messages[2].content, "Héllo!");

        let events = drain(&mut rx);
        let updates: Vec<&str> = events
            .iter()
            .filter_map(|event| match event {
                WidgetEvent::MessageUpdated { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(updates, ["H", "Hé", "Héllo!"]);
        assert_eq!(
            phases(&events),
            [Phase::Sending, Phase::Streaming, Phase::Idle]
        );

        // The snapshot sent to the relay ends with the new user turn.
        let sent = relay.requests();
        assert_eq!(
            sent[0].messages.as_deref().unwrap(),
            [ChatMessage::assistant("Welcome!"), ChatMessage::user("Hi")]
        );
    }

    #[tokio::test]
    async fn second_send_while_streaming_is_rejected() {
        let relay = Arc::new(ScriptedRelay::new());
        let feed = relay.push_channel();
        let chat = controller(&relay);

        let first = tokio::spawn({
            let chat = chat.clone();
            async move { chat.send("first").await }
        });
        wait_until(|| chat.phase() == Phase::Streaming).await;

        assert_eq!(
            chat.send("second").await,
            SendOutcome::Rejected(RejectReason::Busy)
        );

        feed.unbounded_send(Ok(Bytes::from_static(b"done"))).unwrap();
        drop(feed);
        assert_eq!(first.await.unwrap(), SendOutcome::Completed);

        assert_eq!(relay.opens(), 1);
        let users: Vec<_> = chat
            .messages()
            .into_iter()
            .filter(|m| m.role == ChatRole::User)
            .map(|m| m.content)
            .collect();
        assert_eq!(users, ["first"]);
        assert!(!chat.is_busy());
    }

    #[tokio::test]
    async fn unreachable_relay_shows_fallback() {
        let relay = Arc::new(ScriptedRelay::new());
        relay.push_failure(RelayError::Transport("connection refused".to_string()));
        let chat = controller(&relay);
        let mut rx = chat.subscribe();

        assert_eq!(chat.send("Hello").await, SendOutcome::Failed);

        let last = chat.messages().pop().unwrap();
        assert_eq!(last.role, ChatRole::Assistant);
        assert_eq!(last.content, FALLBACK_MESSAGE);
        assert_eq!(chat.phase(), Phase::Idle);
        assert_eq!(
            phases(&drain(&mut rx)),
            [Phase::Sending, Phase::Error, Phase::Idle]
        );
    }

    #[tokio::test]
    async fn error_status_shows_fallback() {
        let relay = Arc::new(ScriptedRelay::new());
        relay.push_failure(RelayError::Status {
            status: 500,
            error: "Failed to process message".to_string(),
        });
        let chat = controller(&relay);

        assert_eq!(chat.send("Hello").await, SendOutcome::Failed);
        assert_eq!(chat.messages().len(), 3);
        assert_eq!(chat.messages()[2].content, FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn broken_stream_keeps_partial_reply() {
        let relay = Arc::new(ScriptedRelay::new());
        relay.push_chunks([
            Ok(&b"Partial "[..]),
            Err(RelayError::Transport("reset".to_string())),
        ]);
        let chat = controller(&relay);

        assert_eq!(chat.send("Hi").await, SendOutcome::Truncated);
        assert_eq!(chat.messages().pop().unwrap().content, "Partial ");
        assert_eq!(chat.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn broken_stream_without_text_shows_fallback() {
        let relay = Arc::new(ScriptedRelay::new());
        relay.push_chunks([Err(RelayError::Transport("reset".to_string()))]);
        let chat = controller(&relay);

        assert_eq!(chat.send("Hi").await, SendOutcome::Truncated);
        let messages = chat.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].content, FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn cancel_stops_reading_and_keeps_text() {
        let relay = Arc::new(ScriptedRelay::new());
        let feed = relay.push_channel();
        let chat = controller(&relay);

        let send = tokio::spawn({
            let chat = chat.clone();
            async move { chat.send("Hi").await }
        });
        feed.unbounded_send(Ok(Bytes::from_static(b"Half"))).unwrap();
        wait_until(|| chat.messages().last().map(|m| m.content.as_str()) == Some("Half")).await;

        chat.cancel();
        assert_eq!(send.await.unwrap(), SendOutcome::Cancelled);
        assert_eq!(chat.messages().pop().unwrap().content, "Half");
        assert!(!chat.is_busy());
        drop(feed);
    }

    #[tokio::test]
    async fn dropped_send_releases_the_guard() {
        let relay = Arc::new(ScriptedRelay::new());
        let _feed = relay.push_channel();
        let chat = controller(&relay);

        let result = tokio::time::timeout(Duration::from_millis(50), chat.send("Hi")).await;
        assert!(result.is_err());

        assert!(!chat.is_busy());
        assert_eq!(chat.phase(), Phase::Idle);
        relay.push_chunks([Ok(&b"again"[..])]);
        assert_eq!(chat.send("Retry").await, SendOutcome::Completed);
    }

    #[derive(Default)]
    struct RecordingSink {
        leads: Mutex<Vec<LeadProfile>>,
    }

    #[async_trait]
    impl LeadSink for RecordingSink {
        async fn submit(&self, profile: &LeadProfile) -> anyhow::Result<()> {
            self.leads.lock().push(profile.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn guided_mode_submits_lead_once() {
        let relay = Arc::new(ScriptedRelay::new());
        let sink = Arc::new(RecordingSink::default());
        let capture = LeadCapture::new(sink.clone());
        let chat = ChatController::new(relay.clone(), capture.question(), FALLBACK_MESSAGE)
            .with_lead_capture(capture);

        for answer in ["Ada", "ada@example.com", "Engines", "Chatbot", "$50k+", "ASAP", "Thanks"] {
            relay.push_chunks([Ok(&b"ok"[..])]);
            assert_eq!(chat.send(answer).await, SendOutcome::Completed);
        }

        let leads = sink.leads.lock().clone();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].email.as_deref(), Some("ada@example.com"));
        assert_eq!(chat.lead_profile(), Some(leads[0].clone()));
        assert!(chat.messages()[0].content.contains("What's your name?"));
    }
}
