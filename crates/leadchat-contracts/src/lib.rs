//! Wire contracts shared by the relay endpoint and the chat widget.
//!
//! Every type here is part of the browser-facing protocol and is exported
//! as a TypeScript binding through `ts-rs`.

mod chat;
mod lead;

pub use chat::{
    CHAT_ENDPOINT, CHAT_OPEN_EVENT, ChatMessage, ChatOpenDetail, ChatRequest, ChatRole, ErrorBody,
};
pub use lead::{LeadProfile, LeadStep};

/// When set, HTTP clients on both sides of the relay skip system proxy
/// discovery.
pub const DISABLE_SYSTEM_PROXY_ENV: &str = "LEADCHAT_DISABLE_SYSTEM_PROXY";

pub fn system_proxy_disabled() -> bool {
    std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some()
}
