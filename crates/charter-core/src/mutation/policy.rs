//! Approval policy: which actions need a human decision
//!
//! Pure lookup, no I/O. Callers consult [`approval_level`] before deciding
//! whether an action goes through the approval queue.

use crate::model::ActionType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How much oversight a project wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApprovalMode {
    /// Nearly everything needs approval
    Strict,
    /// Destructive and governing changes need approval
    #[default]
    Balanced,
    /// Nearly everything proceeds automatically
    Loose,
}

impl ApprovalMode {
    /// Parse a setting string; anything unrecognized is [`ApprovalMode::Balanced`]
    #[must_use]
    pub fn from_setting(setting: &str) -> Self {
        match setting.trim().to_ascii_lowercase().as_str() {
            "strict" => Self::Strict,
            "loose" => Self::Loose,
            _ => Self::Balanced,
        }
    }

    /// Setting string for this mode
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Balanced => "balanced",
            Self::Loose => "loose",
        }
    }
}

impl From<String> for ApprovalMode {
    fn from(setting: String) -> Self {
        Self::from_setting(&setting)
    }
}

impl From<ApprovalMode> for String {
    fn from(mode: ApprovalMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for ApprovalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What has to happen before an action takes effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApprovalLevel {
    /// Proceed
    Auto,
    /// Proceed and tell the owner
    Notify,
    /// Queue for approval
    Approve,
}

impl ApprovalLevel {
    /// Whether the action must go through the approval queue
    #[must_use]
    pub fn requires_approval(self) -> bool {
        self == Self::Approve
    }
}

/// Approval level for `action` under `mode`
#[must_use]
pub fn approval_level(action: ActionType, mode: ApprovalMode) -> ApprovalLevel {
    use ActionType::{
        AddComment, ChangeStatus, CreateEntity, DeleteEntity, RecordDecision, UpdateEntity,
        UpdateVision,
    };
    use ApprovalLevel::{Approve, Auto, Notify};

    match mode {
        ApprovalMode::Strict => match action {
            AddComment => Notify,
            CreateEntity | UpdateEntity | DeleteEntity | ChangeStatus | RecordDecision
            | UpdateVision => Approve,
        },
        ApprovalMode::Balanced => match action {
            CreateEntity | UpdateEntity | AddComment => Auto,
            ChangeStatus => Notify,
            DeleteEntity | RecordDecision | UpdateVision => Approve,
        },
        ApprovalMode::Loose => match action {
            CreateEntity | UpdateEntity | ChangeStatus | AddComment => Auto,
            DeleteEntity | RecordDecision => Notify,
            UpdateVision => Approve,
        },
    }
}
