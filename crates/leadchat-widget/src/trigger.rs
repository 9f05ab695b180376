use leadchat_contracts::{CHAT_OPEN_EVENT, ChatOpenDetail};

use crate::bus::EventBus;

/// Ask whichever widget is mounted on `bus` to open, optionally sending
/// `prompt` right away. Returns how many widgets were reached.
pub fn open_chat(bus: &EventBus, prompt: Option<&str>) -> usize {
    let detail = match prompt {
        Some(prompt) => ChatOpenDetail::with_prompt(prompt),
        None => ChatOpenDetail::default(),
    };
    bus.publish(CHAT_OPEN_EVENT, &detail)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn publishes_open_event_with_prompt() {
        let bus = Arc::new(EventBus::new());
        let mut sub = bus.subscribe::<ChatOpenDetail>(CHAT_OPEN_EVENT);

        assert_eq!(open_chat(&bus, Some("Launch in 10 days")), 1);
        assert_eq!(open_chat(&bus, None), 1);

        assert_eq!(
            sub.recv().await.unwrap().preset_prompt(),
            Some("Launch in 10 days")
        );
        assert_eq!(sub.recv().await.unwrap().preset_prompt(), None);
    }

    #[test]
    fn nothing_mounted_reaches_nobody() {
        let bus = EventBus::new();
        assert_eq!(open_chat(&bus, Some("hi")), 0);
    }
}
