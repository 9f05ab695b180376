pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000";

pub const DEFAULT_WELCOME_MESSAGE: &str = "Hi there! 👋 I'm your AI strategist from aicorelab.dev. Tell me about the AI outcome you're chasing and I'll help you make it real.";

pub const FALLBACK_MESSAGE: &str =
    "Sorry, something went wrong on my side. Mind trying again in a moment?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    /// Base URL of the relay; `/api/chat` is appended.
    pub relay_url: String,
    pub welcome_message: String,
    /// Shown in place of a reply when the relay cannot be reached.
    pub fallback_message: String,
    /// Run the step-wise lead wizard alongside the conversation.
    pub guided: bool,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_string(),
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            fallback_message: FALLBACK_MESSAGE.to_string(),
            guided: false,
        }
    }
}
