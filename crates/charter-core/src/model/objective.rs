//! Objectives: sequentially numbered goals

use super::{patch_optional, patch_required, MetaDraft, MetaPatch, Metadata, Record, Reference};
use charter_identity::sanitize::{sanitize_optional, sanitize_required};
use charter_identity::{EntityKind, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

status_enum! {
    /// Objective lifecycle
    ObjectiveStatus("status") {
        Planned => "planned",
        Active => "active",
        Achieved => "achieved",
        Abandoned => "abandoned",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ObjectiveStatus,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectiveDraft {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<ObjectiveStatus>,
    pub meta: MetaDraft,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectivePatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<ObjectiveStatus>,
    pub meta: MetaPatch,
}

impl Record for Objective {
    const KIND: EntityKind = EntityKind::Objective;
    type Draft = ObjectiveDraft;
    type Patch = ObjectivePatch;

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
        Vec::new()
    }

    fn from_draft(draft: ObjectiveDraft, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: String::new(),
            title: sanitize_required("title", &draft.title)?,
            description: sanitize_optional("description", draft.description.as_deref())?,
            status: draft.status.unwrap_or_default(),
            metadata: Metadata::from_draft(draft.meta, now)?,
        })
    }

    fn apply_patch(&mut self, patch: ObjectivePatch) -> Result<(), ValidationError> {
        let title = patch_required("title", patch.title.as_deref())?;
        let description = patch_optional("description", patch.description)?;
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
        self.metadata = metadata;
        Ok(())
    }
}
