use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use leadchat_contracts::{CHAT_OPEN_EVENT, ChatOpenDetail};
use tokio::sync::broadcast;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::bus::EventBus;
use crate::config::WidgetConfig;
use crate::controller::{ChatController, SendOutcome};
use crate::events::WidgetEvent;
use crate::lead::{LeadCapture, LeadSink, LogLeadSink};
use crate::quick_actions;
use crate::relay::RelayTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MountError {
    #[error("widget is already mounted")]
    AlreadyMounted,
}

/// The chat panel: a controller plus open/close state.
pub struct ChatWidget {
    controller: ChatController,
    open: AtomicBool,
    mounted: AtomicBool,
}

impl ChatWidget {
    pub fn new(config: &WidgetConfig, transport: Arc<dyn RelayTransport>) -> Self {
        Self::with_lead_sink(config, transport, Arc::new(LogLeadSink))
    }

    /// Like [`ChatWidget::new`], handing completed leads to `sink` when the
    /// config enables guided mode.
    pub fn with_lead_sink(
        config: &WidgetConfig,
        transport: Arc<dyn RelayTransport>,
        sink: Arc<dyn LeadSink>,
    ) -> Self {
        let controller = if config.guided {
            let capture = LeadCapture::new(sink);
            ChatController::new(transport, capture.question(), &config.fallback_message)
                .with_lead_capture(capture)
        } else {
            ChatController::new(
                transport,
                &config.welcome_message,
                &config.fallback_message,
            )
        };

        Self {
            controller,
            open: AtomicBool::new(false),
            mounted: AtomicBool::new(false),
        }
    }

    pub fn controller(&self) -> &ChatController {
        &self.controller
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.controller.subscribe()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn open(&self) {
        if !self.open.swap(true, Ordering::AcqRel) {
            self.controller.emit(WidgetEvent::Opened);
        }
    }

    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            self.controller.emit(WidgetEvent::Closed);
        }
    }

    pub async fn send(&self, text: &str) -> SendOutcome {
        self.controller.send(text).await
    }

    /// Open the panel and send the quick action's prompt. `None` for an
    /// unknown label.
    pub async fn quick_action(&self, label: &str) -> Option<SendOutcome> {
        let action = quick_actions::find(label)?;
        self.open();
        Some(self.send(action.prompt).await)
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Listen for `chat:open` on `bus` until the returned handle is
    /// unmounted or dropped. A widget holds at most one subscription.
    pub fn mount(self: &Arc<Self>, bus: &Arc<EventBus>) -> Result<MountedWidget, MountError> {
        if self.mounted.swap(true, Ordering::AcqRel) {
            return Err(MountError::AlreadyMounted);
        }

        let mut subscription = bus.subscribe::<ChatOpenDetail>(CHAT_OPEN_EVENT);
        let subscription_id = subscription.id();

        let widget = Arc::clone(self);
        let listener = tokio::spawn(async move {
            while let Some(detail) = subscription.recv().await {
                widget.open();
                if let Some(prompt) = detail.preset_prompt() {
                    let widget = Arc::clone(&widget);
                    let prompt = prompt.to_string();
                    tokio::spawn(async move {
                        let outcome = widget.send(&prompt).await;
                        tracing::debug!(?outcome, "Preset prompt handled");
                    });
                }
            }
        });

        Ok(MountedWidget {
            widget: Arc::clone(self),
            bus: Arc::clone(bus),
            subscription_id,
            listener,
        })
    }
}

/// A widget attached to an event bus.
pub struct MountedWidget {
    widget: Arc<ChatWidget>,
    bus: Arc<EventBus>,
    subscription_id: u64,
    listener: JoinHandle<()>,
}

impl MountedWidget {
    pub fn widget(&self) -> &Arc<ChatWidget> {
        &self.widget
    }

    /// Detach from the bus and stop any reply still streaming.
    pub fn unmount(self) {}
}

impl Drop for MountedWidget {
    fn drop(&mut self) {
        self.bus.unsubscribe(CHAT_OPEN_EVENT, self.subscription_id);
        self.listener.abort();
        self.widget.controller.cancel();
        self.widget.mounted.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use leadchat_contracts::ChatRole;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::controller::Phase;
    use crate::relay::HttpRelay;
    use crate::relay::testing::ScriptedRelay;
    use crate::trigger::open_chat;

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    fn user_messages(widget: &ChatWidget) -> Vec<String> {
        widget
            .controller()
            .messages()
            .into_iter()
            .filter(|m| m.role == ChatRole::User)
            .map(|m| m.content)
            .collect()
    }

    #[tokio::test]
    async fn open_and_close_emit_once() {
        let widget = ChatWidget::new(&WidgetConfig::default(), Arc::new(ScriptedRelay::new()));
        let mut rx = widget.subscribe();

        widget.open();
        widget.open();
        assert!(widget.is_open());
        widget.close();
        assert!(!widget.is_open());

        assert_eq!(rx.try_recv().unwrap(), WidgetEvent::Opened);
        assert_eq!(rx.try_recv().unwrap(), WidgetEvent::Closed);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn quick_action_opens_and_sends_prompt() {
        let relay = Arc::new(ScriptedRelay::new());
        relay.push_chunks([Ok(&b"Let's scope it."[..])]);
        let widget = ChatWidget::new(&WidgetConfig::default(), relay.clone());

        let outcome = widget.quick_action("Automate workflows").await;
        assert_eq!(outcome, Some(SendOutcome::Completed));
        assert!(widget.is_open());
        assert_eq!(
            user_messages(&widget),
            [quick_actions::find("Automate workflows").unwrap().prompt]
        );

        assert_eq!(widget.quick_action("Unknown").await, None);
        assert_eq!(relay.opens(), 1);
    }

    #[tokio::test]
    async fn open_event_with_prompt_sends_exactly_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "messages": [
                    {"role": "assistant"},
                    {"role": "user", "content": "Automate workflows"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("Happy to help!"))
            .expect(1)
            .mount(&server)
            .await;

        let relay = Arc::new(HttpRelay::new(&server.uri()).unwrap());
        let widget = Arc::new(ChatWidget::new(&WidgetConfig::default(), relay));
        let bus = Arc::new(EventBus::new());
        let mounted = widget.mount(&bus).unwrap();

        assert_eq!(open_chat(&bus, Some("Automate workflows")), 1);
        wait_until(|| {
            widget
                .controller()
                .messages()
                .last()
                .is_some_and(|m| m.content == "Happy to help!")
        })
        .await;

        assert!(widget.is_open());
        assert_eq!(user_messages(&widget), ["Automate workflows"]);
        assert_eq!(widget.controller().phase(), Phase::Idle);
        mounted.unmount();
    }

    #[tokio::test]
    async fn open_event_without_prompt_only_opens() {
        let relay = Arc::new(ScriptedRelay::new());
        let widget = Arc::new(ChatWidget::new(&WidgetConfig::default(), relay.clone()));
        let bus = Arc::new(EventBus::new());
        let _mounted = widget.mount(&bus).unwrap();

        open_chat(&bus, None);
        wait_until(|| widget.is_open()).await;

        assert_eq!(relay.opens(), 0);
        assert_eq!(widget.controller().messages().len(), 1);
    }

    #[tokio::test]
    async fn unmount_unsubscribes_and_cancels() {
        let relay = Arc::new(ScriptedRelay::new());
        let feed = relay.push_channel();
        let widget = Arc::new(ChatWidget::new(&WidgetConfig::default(), relay.clone()));
        let bus = Arc::new(EventBus::new());
        let mounted = widget.mount(&bus).unwrap();
        assert_eq!(bus.listener_count(CHAT_OPEN_EVENT), 1);

        open_chat(&bus, Some("Hi"));
        wait_until(|| widget.controller().phase() == Phase::Streaming).await;

        mounted.unmount();
        assert_eq!(bus.listener_count(CHAT_OPEN_EVENT), 0);
        assert_eq!(open_chat(&bus, Some("Hi again")), 0);

        wait_until(|| !widget.controller().is_busy()).await;
        assert_eq!(relay.opens(), 1);
        drop(feed);
    }

    #[tokio::test]
    async fn second_mount_is_refused_until_unmount() {
        let relay = Arc::new(ScriptedRelay::new());
        relay.push_chunks([Ok(&b"Once."[..])]);
        let widget = Arc::new(ChatWidget::new(&WidgetConfig::default(), relay.clone()));
        let bus = Arc::new(EventBus::new());

        let mounted = widget.mount(&bus).unwrap();
        assert!(matches!(widget.mount(&bus), Err(MountError::AlreadyMounted)));
        assert!(widget.is_mounted());
        assert_eq!(bus.listener_count(CHAT_OPEN_EVENT), 1);

        assert_eq!(open_chat(&bus, Some("Hi")), 1);
        wait_until(|| {
            widget
                .controller()
                .messages()
                .last()
                .is_some_and(|m| m.content == "Once.")
        })
        .await;
        assert_eq!(relay.opens(), 1);
        assert_eq!(user_messages(&widget), ["Hi"]);

        mounted.unmount();
        assert!(!widget.is_mounted());
        let remounted = widget.mount(&bus).unwrap();
        assert_eq!(bus.listener_count(CHAT_OPEN_EVENT), 1);
        remounted.unmount();
    }

    #[tokio::test]
    async fn guided_widget_greets_with_first_question() {
        let config = WidgetConfig {
            guided: true,
            ..WidgetConfig::default()
        };
        let widget = ChatWidget::new(&config, Arc::new(ScriptedRelay::new()));

        let welcome = &widget.controller().messages()[0];
        assert!(welcome.content.contains("What's your name?"));
        assert!(widget.controller().lead_capture().is_some());
    }
}
