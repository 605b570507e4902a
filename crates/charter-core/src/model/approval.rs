//! Approval requests and their state machine
//!
//! `pending -> approved | rejected`, both terminal. Pending requests live in
//! the shared queue file; resolved ones move to a per-outcome file.

use super::{MetaDraft, Metadata, Record, Reference};
use charter_identity::sanitize::{sanitize_optional, sanitize_required};
use charter_identity::{validate_id, EntityKind, Resolution, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

status_enum! {
    /// Approval lifecycle
    ApprovalStatus("status") {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

impl ApprovalStatus {
    /// States reachable from `self` in one step
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [ApprovalStatus] {
        match self {
            Self::Pending => &[Self::Approved, Self::Rejected],
            Self::Approved | Self::Rejected => &[],
        }
    }

    /// Whether no further transition is possible
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Check a single transition
    ///
    /// # Errors
    /// [`ValidationError`] scoped to `status` when `to` is not reachable.
    pub fn validate_transition(self, to: ApprovalStatus) -> Result<(), ValidationError> {
        if self.allowed_transitions().contains(&to) {
            Ok(())
        } else {
            Err(ValidationError::invalid(
                "status",
                format!("cannot move from {self} to {to}"),
            ))
        }
    }
}

impl From<Resolution> for ApprovalStatus {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Approved => Self::Approved,
            Resolution::Rejected => Self::Rejected,
        }
    }
}

status_enum! {
    /// Kind of change an approval request proposes
    ActionType("action") {
        CreateEntity => "create_entity",
        UpdateEntity => "update_entity",
        DeleteEntity => "delete_entity",
        ChangeStatus => "change_status",
        RecordDecision => "record_decision",
        UpdateVision => "update_vision",
        AddComment => "add_comment",
    }
}

impl ActionType {
    /// Every action, in declaration order
    pub const ALL: [ActionType; 7] = [
        Self::CreateEntity,
        Self::UpdateEntity,
        Self::DeleteEntity,
        Self::ChangeStatus,
        Self::RecordDecision,
        Self::UpdateVision,
        Self::AddComment,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingApproval {
    pub id: String,
    pub action: ActionType,
    /// Kind the proposed change touches, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_kind: Option<EntityKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    pub summary: String,
    pub requested_by: String,
    #[serde(default)]
    pub status: ApprovalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone)]
pub struct ApprovalDraft {
    pub action: ActionType,
    pub target_kind: Option<EntityKind>,
    pub target_id: Option<String>,
    pub summary: String,
    pub requested_by: String,
    pub meta: MetaDraft,
}

impl ApprovalDraft {
    /// Request for `action` with no target
    #[must_use]
    pub fn new(
        action: ActionType,
        summary: impl Into<String>,
        requested_by: impl Into<String>,
    ) -> Self {
        Self {
            action,
            target_kind: None,
            target_id: None,
            summary: summary.into(),
            requested_by: requested_by.into(),
            meta: MetaDraft::default(),
        }
    }

    /// Name the record the change applies to
    #[must_use]
    pub fn targeting(mut self, kind: EntityKind, id: impl Into<String>) -> Self {
        self.target_kind = Some(kind);
        self.target_id = Some(id.into());
        self
    }
}

/// Resolution of a pending approval: the only "update" approvals accept
#[derive(Debug, Clone)]
pub struct ApprovalResolution {
    pub outcome: Resolution,
    pub resolved_by: String,
    pub note: Option<String>,
}

impl ApprovalResolution {
    #[must_use]
    pub fn approve(resolved_by: impl Into<String>) -> Self {
        Self {
            outcome: Resolution::Approved,
            resolved_by: resolved_by.into(),
            note: None,
        }
    }

    #[must_use]
    pub fn reject(resolved_by: impl Into<String>) -> Self {
        Self {
            outcome: Resolution::Rejected,
            resolved_by: resolved_by.into(),
            note: None,
        }
    }

    /// Attach a note
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl PendingApproval {
    /// Move to the resolution's terminal state, stamping `now`
    ///
    /// # Errors
    /// [`ValidationError`] if already resolved or the resolution text is bad;
    /// the record is unchanged on error.
    pub fn resolve(
        &mut self,
        resolution: ApprovalResolution,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        let target = ApprovalStatus::from(resolution.outcome);
        self.status.validate_transition(target)?;
        let resolved_by = sanitize_required("resolved_by", &resolution.resolved_by)?;
        let note = sanitize_optional("note", resolution.note.as_deref())?;

        self.status = target;
        self.resolved_by = Some(resolved_by);
        self.resolved_at = Some(now);
        self.note = note;
        self.metadata.updated_at = now;
        Ok(())
    }
}

impl Record for PendingApproval {
    const KIND: EntityKind = EntityKind::Approval;
    type Draft = ApprovalDraft;
    type Patch = ApprovalResolution;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    fn status_label(&self) -> Option<&'static str> {
        Some(self.status.as_str())
    }

    /// The target is informational and never integrity-checked
    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }

    fn from_draft(draft: ApprovalDraft, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let target_id = match (draft.target_kind, draft.target_id.as_deref()) {
            (Some(kind), Some(id)) => {
                validate_id(kind, id)
                    .map_err(|_| ValidationError::invalid("target_id", format!("{id:?} is not a valid {kind} id")))?;
                Some(id.to_string())
            }
            (None, Some(_)) => {
                return Err(ValidationError::invalid(
                    "target_kind",
                    "a target id needs a target kind",
                ))
            }
            (_, None) => None,
        };

        Ok(Self {
            id: String::new(),
            action: draft.action,
            target_kind: draft.target_kind,
            target_id,
            summary: sanitize_required("summary", &draft.summary)?,
            requested_by: sanitize_required("requested_by", &draft.requested_by)?,
            status: ApprovalStatus::Pending,
            resolved_by: None,
            resolved_at: None,
            note: None,
            metadata: Metadata::from_draft(draft.meta, now)?,
        })
    }

    fn apply_patch(&mut self, patch: ApprovalResolution) -> Result<(), ValidationError> {
        self.resolve(patch, Utc::now())
    }
}
