//! Project vision, one per store

use super::{patch_optional, patch_required, MetaDraft, MetaPatch, Metadata, Record, Reference};
use charter_identity::sanitize::{sanitize_optional, sanitize_required};
use charter_identity::{EntityKind, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vision {
    pub id: String,
    pub statement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default)]
pub struct VisionDraft {
    pub statement: String,
    pub summary: Option<String>,
    pub meta: MetaDraft,
}

#[derive(Debug, Clone, Default)]
pub struct VisionPatch {
    pub statement: Option<String>,
    pub summary: Option<Option<String>>,
    pub meta: MetaPatch,
}

impl Record for Vision {
    const KIND: EntityKind = EntityKind::Vision;
    type Draft = VisionDraft;
    type Patch = VisionPatch;

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
        None
    }

    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }

    fn from_draft(draft: VisionDraft, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: String::new(),
            statement: sanitize_required("statement", &draft.statement)?,
            summary: sanitize_optional("summary", draft.summary.as_deref())?,
            metadata: Metadata::from_draft(draft.meta, now)?,
        })
    }

    fn apply_patch(&mut self, patch: VisionPatch) -> Result<(), ValidationError> {
        let statement = patch_required("statement", patch.statement.as_deref())?;
        let summary = patch_optional("summary", patch.summary)?;
        let mut metadata = self.metadata.clone();
        metadata.apply(patch.meta)?;

        if let Some(statement) = statement {
            self.statement = statement;
        }
        if let Some(summary) = summary {
            self.summary = summary;
        }
        self.metadata = metadata;
        Ok(())
    }
}
