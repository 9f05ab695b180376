//! Process-wide publish/subscribe keyed by event name.
//!
//! Any component can open the chat without holding a reference to the widget:
//! it publishes on the shared bus and whoever subscribed to that name reacts.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;

static GLOBAL_BUS: Lazy<Arc<EventBus>> = Lazy::new(|| Arc::new(EventBus::new()));

type Listener = (u64, mpsc::UnboundedSender<Value>);

#[derive(Debug, Default)]
pub struct EventBus {
    listeners: Mutex<HashMap<String, Vec<Listener>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared application bus.
    pub fn global() -> Arc<EventBus> {
        Arc::clone(&GLOBAL_BUS)
    }

    /// Listen for `name`. The listener is removed when the returned
    /// subscription is dropped.
    pub fn subscribe<T: DeserializeOwned>(self: &Arc<Self>, name: &str) -> Subscription<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners
            .lock()
            .entry(name.to_string())
            .or_default()
            .push((id, tx));

        Subscription {
            bus: Arc::clone(self),
            name: name.to_string(),
            id,
            receiver: rx,
            _payload: PhantomData,
        }
    }

    /// Deliver `detail` to every listener of `name`. Returns how many
    /// listeners received it.
    pub fn publish<T: Serialize + ?Sized>(&self, name: &str, detail: &T) -> usize {
        let payload = match serde_json::to_value(detail) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(event = name, error = %err, "Failed to encode event payload");
                return 0;
            }
        };

        let mut listeners = self.listeners.lock();
        let Some(targets) = listeners.get_mut(name) else {
            return 0;
        };
        targets.retain(|(_, tx)| !tx.is_closed());
        targets
            .iter()
            .filter(|(_, tx)| tx.send(payload.clone()).is_ok())
            .count()
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.lock().get(name).map_or(0, Vec::len)
    }

    pub(crate) fn unsubscribe(&self, name: &str, id: u64) {
        let mut listeners = self.listeners.lock();
        if let Some(targets) = listeners.get_mut(name) {
            targets.retain(|(listener, _)| *listener != id);
            if targets.is_empty() {
                listeners.remove(name);
            }
        }
    }
}

/// Typed receiving end of one bus listener.
#[derive(Debug)]
pub struct Subscription<T> {
    bus: Arc<EventBus>,
    name: String,
    id: u64,
    receiver: mpsc::UnboundedReceiver<Value>,
    _payload: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Subscription<T> {
    /// Next payload for this event. Payloads that do not decode as `T` are
    /// logged and skipped.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            let value = self.receiver.recv().await?;
            match serde_json::from_value(value) {
                Ok(detail) => return Some(detail),
                Err(err) => {
                    tracing::warn!(event = %self.name, error = %err, "Dropping malformed event payload");
                }
            }
        }
    }
}

impl<T> Subscription<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.name, self.id);
    }
}
