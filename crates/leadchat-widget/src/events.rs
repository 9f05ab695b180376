use crate::controller::Phase;
use crate::transcript::TranscriptEntry;

/// Change notifications for anything rendering the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    MessageAppended(TranscriptEntry),
    /// `content` is the entry's whole new content, not a delta.
    MessageUpdated { id: String, content: String },
    PhaseChanged(Phase),
    Opened,
    Closed,
}
