//! leadchat widget - client side of the lead-capture chat
//!
//! This crate provides:
//! - [`ChatController`]: transcript, single-flight send and incremental
//!   rendering of the streamed reply
//! - [`ChatWidget`]: open/close state, quick actions and the `chat:open`
//!   trigger wiring through the process-wide [`EventBus`]
//! - [`HttpRelay`]: the HTTP transport to the relay endpoint
//! - [`LeadWizard`]: the step-wise lead form used by guided mode

pub mod bus;
pub mod config;
pub mod controller;
pub mod decoder;
pub mod events;
pub mod lead;
pub mod quick_actions;
pub mod relay;
pub mod transcript;
pub mod trigger;
pub mod widget;

pub use bus::{EventBus, Subscription};
pub use config::WidgetConfig;
pub use controller::{ChatController, Phase, RejectReason, SendOutcome};
pub use decoder::Utf8StreamDecoder;
pub use events::WidgetEvent;
pub use lead::{LeadCapture, LeadSink, LeadWizard, LogLeadSink};
pub use quick_actions::{QUICK_ACTIONS, QuickAction};
pub use relay::{ByteStream, HttpRelay, RelayError, RelayTransport};
pub use transcript::{Transcript, TranscriptEntry};
pub use widget::{ChatWidget, MountError, MountedWidget};
