use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Field the step-wise lead form is currently asking for.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum LeadStep {
    #[default]
    Name,
    Email,
    Company,
    Project,
    Budget,
    Timeline,
    Complete,
}

impl LeadStep {
    /// Step that follows this one. `Complete` is terminal.
    pub fn next(self) -> Self {
        match self {
            Self::Name => Self::Email,
            Self::Email => Self::Company,
            Self::Company => Self::Project,
            Self::Project => Self::Budget,
            Self::Budget => Self::Timeline,
            Self::Timeline | Self::Complete => Self::Complete,
        }
    }

    pub fn is_complete(self) -> bool {
        self == Self::Complete
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Company => "company",
            Self::Project => "project",
            Self::Budget => "budget",
            Self::Timeline => "timeline",
            Self::Complete => "complete",
        }
    }
}

/// Contact and project details collected from a prospect.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LeadProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
}
