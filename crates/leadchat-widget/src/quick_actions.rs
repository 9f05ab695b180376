/// A canned conversation starter shown beside the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickAction {
    pub label: &'static str,
    pub prompt: &'static str,
}

pub const QUICK_ACTIONS: [QuickAction; 4] = [
    QuickAction {
        label: "Build an AI assistant",
        prompt: "I'm interested in building a custom AI assistant for my customers. What would collaborating with aicorelab.dev look like?",
    },
    QuickAction {
        label: "Automate workflows",
        prompt: "I'd like to automate parts of our internal workflow with AI. Can you help me scope that project?",
    },
    QuickAction {
        label: "Launch in 10 days",
        prompt: "Can you walk me through how you launch AI products in 10 days and what you need from me?",
    },
    QuickAction {
        label: "AI analytics",
        prompt: "We need AI-powered analytics dashboards for our data. How would your team approach this?",
    },
];

/// Look up a quick action by label, ignoring case and surrounding space.
pub fn find(label: &str) -> Option<&'static QuickAction> {
    let label = label.trim();
    QUICK_ACTIONS
        .iter()
        .find(|action| action.label.eq_ignore_ascii_case(label))
}
