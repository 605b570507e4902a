//! Tasks, stored together in one array file

use super::{
    patch_optional, patch_reference, patch_required, reference_id, MetaDraft, MetaPatch, Metadata,
    Record, Reference,
};
use charter_identity::sanitize::{sanitize_optional, sanitize_required};
use charter_identity::{EntityKind, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

status_enum! {
    /// Task lifecycle
    TaskStatus("status") {
        Todo => "todo",
        InProgress => "in_progress",
        Blocked => "blocked",
        Done => "done",
    }
}

/// Upper bound of [`Task::progress`]
pub const MAX_PROGRESS: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    /// Percent complete
    #[serde(default)]
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deliverable_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub metadata: Metadata,
}

impl Task {
    /// Whether progress and status disagree about completion
    #[must_use]
    pub fn completion_mismatch(&self) -> bool {
        (self.progress == MAX_PROGRESS) != (self.status == TaskStatus::Done)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub progress: Option<u8>,
    pub deliverable_id: Option<String>,
    pub assignee: Option<String>,
    pub meta: MetaDraft,
}

#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub progress: Option<u8>,
    pub deliverable_id: Option<Option<String>>,
    pub assignee: Option<Option<String>>,
    pub meta: MetaPatch,
}

fn check_progress(progress: u8) -> Result<u8, ValidationError> {
    if progress > MAX_PROGRESS {
        return Err(ValidationError::invalid(
            "progress",
            format!("{progress} is outside 0..={MAX_PROGRESS}"),
        ));
    }
    Ok(progress)
}

impl Record for Task {
    const KIND: EntityKind = EntityKind::Task;
    type Draft = TaskDraft;
    type Patch = TaskPatch;

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

    fn references(&self) -> Vec<Reference> {
        Reference::optional("deliverable_id", EntityKind::Deliverable, self.deliverable_id.as_ref())
            .into_iter()
            .chain(Reference::optional("assignee", EntityKind::Actor, self.assignee.as_ref()))
            .collect()
    }

    fn from_draft(draft: TaskDraft, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: String::new(),
            title: sanitize_required("title", &draft.title)?,
            description: sanitize_optional("description", draft.description.as_deref())?,
            status: draft.status.unwrap_or_default(),
            progress: check_progress(draft.progress.unwrap_or(0))?,
            deliverable_id: reference_id(
                "deliverable_id",
                EntityKind::Deliverable,
                draft.deliverable_id.as_deref(),
            )?,
            assignee: reference_id("assignee", EntityKind::Actor, draft.assignee.as_deref())?,
            metadata: Metadata::from_draft(draft.meta, now)?,
        })
    }

    fn apply_patch(&mut self, patch: TaskPatch) -> Result<(), ValidationError> {
        let title = patch_required("title", patch.title.as_deref())?;
        let description = patch_optional("description", patch.description)?;
        let progress = patch.progress.map(check_progress).transpose()?;
        let deliverable_id =
            patch_reference("deliverable_id", EntityKind::Deliverable, patch.deliverable_id)?;
        let assignee = patch_reference("assignee", EntityKind::Actor, patch.assignee)?;
        let mut metadata = self.metadata.clone();
        metadata.apply(patch.meta)?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(progress) = progress {
            self.progress = progress;
        }
        if let Some(deliverable_id) = deliverable_id {
            self.deliverable_id = deliverable_id;
        }
        if let Some(assignee) = assignee {
            self.assignee = assignee;
        }
        self.metadata = metadata;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str) -> Task {
        Task::from_draft(
            TaskDraft {
                title: title.into(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn progress_over_hundred_is_rejected() {
        let mut t = task("Write docs");
        let err = t
            .apply_patch(TaskPatch {
                progress: Some(101),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.field(), Some("progress"));
        assert_eq!(t.progress, 0);
    }

    #[test]
    fn completion_mismatch_both_directions() {
        let mut t = task("Write docs");
        assert!(!t.completion_mismatch());
        t.progress = 100;
        assert!(t.completion_mismatch());
        t.status = TaskStatus::Done;
        assert!(!t.completion_mismatch());
        t.progress = 40;
        assert!(t.completion_mismatch());
    }

    #[test]
    fn references_cover_deliverable_and_assignee() {
        let t = Task::from_draft(
            TaskDraft {
                title: "Deploy".into(),
                deliverable_id: Some("del-004".into()),
                assignee: Some("actor-0badc0de".into()),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        let kinds: Vec<_> = t.references().into_iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![EntityKind::Deliverable, EntityKind::Actor]);
    }
}
