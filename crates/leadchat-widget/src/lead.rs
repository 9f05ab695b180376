//! Step-wise lead capture used by guided mode.

use std::sync::Arc;

use async_trait::async_trait;
use leadchat_contracts::{LeadProfile, LeadStep};
use parking_lot::Mutex;

/// Explicit state machine over [`LeadStep`]. Each non-blank answer fills the
/// current field and advances exactly one step.
#[derive(Debug, Clone, Default)]
pub struct LeadWizard {
    step: LeadStep,
    profile: LeadProfile,
}

impl LeadWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> LeadStep {
        self.step
    }

    pub fn profile(&self) -> &LeadProfile {
        &self.profile
    }

    pub fn is_complete(&self) -> bool {
        self.step.is_complete()
    }

    /// 1-based position of the current step out of the six collected fields.
    pub fn progress(&self) -> (usize, usize) {
        let position = match self.step {
            LeadStep::Name => 1,
            LeadStep::Email => 2,
            LeadStep::Company => 3,
            LeadStep::Project => 4,
            LeadStep::Budget => 5,
            LeadStep::Timeline | LeadStep::Complete => 6,
        };
        (position, 6)
    }

    pub fn question(&self) -> String {
        match self.step {
            LeadStep::Name => {
                "Hi! 👋 I'm your AI assistant. I'd love to learn more about your project. What's your name?".to_string()
            }
            LeadStep::Email => format!(
                "Nice to meet you, {}! What's your email address so we can send you a proposal?",
                self.profile.name.as_deref().unwrap_or("there")
            ),
            LeadStep::Company => "Great! What's your company name?".to_string(),
            LeadStep::Project => "Tell me about your project. What kind of AI solution are you looking for? (e.g., chatbot, automation, analytics)".to_string(),
            LeadStep::Budget => "What's your budget range for this project? (e.g., $10k-$25k, $25k-$50k, $50k+)".to_string(),
            LeadStep::Timeline => {
                "When would you like to launch? (e.g., ASAP, 1-2 months, 3+ months)".to_string()
            }
            LeadStep::Complete => self.summary(),
        }
    }

    /// Record an answer for the current step. Returns the step that was
    /// filled, or `None` for blank answers and a finished wizard.
    pub fn record(&mut self, answer: &str) -> Option<LeadStep> {
        let answer = answer.trim();
        if answer.is_empty() || self.is_complete() {
            return None;
        }

        let filled = self.step;
        let value = Some(answer.to_string());
        match filled {
            LeadStep::Name => self.profile.name = value,
            LeadStep::Email => self.profile.email = value,
            LeadStep::Company => self.profile.company = value,
            LeadStep::Project => self.profile.project_type = value,
            LeadStep::Budget => self.profile.budget = value,
            LeadStep::Timeline => self.profile.timeline = value,
            LeadStep::Complete => return None,
        }
        self.step = filled.next();
        Some(filled)
    }

    fn summary(&self) -> String {
        let field = |value: &Option<String>| value.clone().unwrap_or_default();
        format!(
            "Perfect! 🚀 I have all the information I need:\n\n\
             • Name: {}\n• Email: {}\n• Company: {}\n• Project: {}\n• Budget: {}\n• Timeline: {}\n\n\
             Our team will review your requirements and get back to you within 24 hours!",
            field(&self.profile.name),
            field(&self.profile.email),
            field(&self.profile.company),
            field(&self.profile.project_type),
            field(&self.profile.budget),
            field(&self.profile.timeline),
        )
    }
}

/// Receives a completed lead profile.
#[async_trait]
pub trait LeadSink: Send + Sync {
    async fn submit(&self, profile: &LeadProfile) -> anyhow::Result<()>;
}

/// Sink that only records the lead in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLeadSink;

#[async_trait]
impl LeadSink for LogLeadSink {
    async fn submit(&self, profile: &LeadProfile) -> anyhow::Result<()> {
        tracing::info!(
            lead_name = profile.name.as_deref().unwrap_or_default(),
            email = profile.email.as_deref().unwrap_or_default(),
            company = profile.company.as_deref().unwrap_or_default(),
            "Lead captured"
        );
        Ok(())
    }
}

/// Wizard plus sink, shared by a guided controller.
pub struct LeadCapture {
    wizard: Mutex<LeadWizard>,
    sink: Arc<dyn LeadSink>,
}

impl LeadCapture {
    pub fn new(sink: Arc<dyn LeadSink>) -> Self {
        Self {
            wizard: Mutex::new(LeadWizard::new()),
            sink,
        }
    }

    pub fn question(&self) -> String {
        self.wizard.lock().question()
    }

    pub fn wizard(&self) -> LeadWizard {
        self.wizard.lock().clone()
    }

    /// Record an accepted user message. Returns the profile exactly once,
    /// on the answer that completes the wizard.
    pub(crate) fn record(&self, answer: &str) -> Option<LeadProfile> {
        let mut wizard = self.wizard.lock();
        let filled = wizard.record(answer)?;
        tracing::debug!(step = filled.as_str(), "Lead field captured");
        wizard.is_complete().then(|| wizard.profile().clone())
    }

    pub(crate) async fn submit(&self, profile: &LeadProfile) {
        if let Err(err) = self.sink.submit(profile).await {
            tracing::warn!(error = %err, "Failed to submit lead");
        }
    }
}
