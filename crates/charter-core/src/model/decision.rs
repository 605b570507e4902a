//! Decisions: immutable once recorded

use super::{
    patch_optional, patch_reference, patch_required, reference_id, MetaDraft, MetaPatch, Metadata,
    Record, Reference,
};
use charter_identity::sanitize::{sanitize_optional, sanitize_required};
use charter_identity::{EntityKind, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub title: String,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consideration_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default)]
pub struct DecisionDraft {
    pub title: String,
    pub rationale: String,
    pub consideration_id: Option<String>,
    pub decided_by: Option<String>,
    pub meta: MetaDraft,
}

/// Field set mirroring [`DecisionDraft`]
///
/// Handlers refuse every decision update before a patch is looked at; the
/// type exists so decisions go through the same registry surface as every
/// other kind.
#[derive(Debug, Clone, Default)]
pub struct DecisionPatch {
    pub title: Option<String>,
    pub rationale: Option<String>,
    pub consideration_id: Option<Option<String>>,
    pub decided_by: Option<Option<String>>,
    pub meta: MetaPatch,
}

impl Record for Decision {
    const KIND: EntityKind = EntityKind::Decision;
    type Draft = DecisionDraft;
    type Patch = DecisionPatch;

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
        Reference::optional(
            "consideration_id",
            EntityKind::Consideration,
            self.consideration_id.as_ref(),
        )
        .into_iter()
        .collect()
    }

    fn from_draft(draft: DecisionDraft, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: String::new(),
            title: sanitize_required("title", &draft.title)?,
            rationale: sanitize_required("rationale", &draft.rationale)?,
            consideration_id: reference_id(
                "consideration_id",
                EntityKind::Consideration,
                draft.consideration_id.as_deref(),
            )?,
            decided_by: sanitize_optional("decided_by", draft.decided_by.as_deref())?,
            metadata: Metadata::from_draft(draft.meta, now)?,
        })
    }

    fn apply_patch(&mut self, patch: DecisionPatch) -> Result<(), ValidationError> {
        let title = patch_required("title", patch.title.as_deref())?;
        let rationale = patch_required("rationale", patch.rationale.as_deref())?;
        let consideration_id = patch_reference(
            "consideration_id",
            EntityKind::Consideration,
            patch.consideration_id,
        )?;
        let decided_by = patch_optional("decided_by", patch.decided_by)?;
        let mut metadata = self.metadata.clone();
        metadata.apply(patch.meta)?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(rationale) = rationale {
            self.rationale = rationale;
        }
        if let Some(consideration_id) = consideration_id {
            self.consideration_id = consideration_id;
        }
        if let Some(decided_by) = decided_by {
            self.decided_by = decided_by;
        }
        self.metadata = metadata;
        Ok(())
    }
}
