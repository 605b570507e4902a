//! Considerations: open questions that a decision eventually settles

use super::{
    patch_optional, patch_reference, patch_required, MetaDraft, MetaPatch, Metadata, Record,
    Reference,
};
use charter_identity::sanitize::{sanitize_optional, sanitize_required};
use charter_identity::{EntityKind, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

status_enum! {
    /// Consideration lifecycle
    ConsiderationStatus("status") {
        Open => "open",
        Decided => "decided",
        Deferred => "deferred",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consideration {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default)]
    pub status: ConsiderationStatus,
    /// Back-link set when a decision settles this consideration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_id: Option<String>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default)]
pub struct ConsiderationDraft {
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<String>,
    pub meta: MetaDraft,
}

#[derive(Debug, Clone, Default)]
pub struct ConsiderationPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub options: Option<Vec<String>>,
    pub status: Option<ConsiderationStatus>,
    pub decision_id: Option<Option<String>>,
    pub meta: MetaPatch,
}

fn sanitize_options(options: &[String]) -> Result<Vec<String>, ValidationError> {
    options
        .iter()
        .map(|o| sanitize_required("option", o))
        .collect()
}

impl Record for Consideration {
    const KIND: EntityKind = EntityKind::Consideration;
    type Draft = ConsiderationDraft;
    type Patch = ConsiderationPatch;

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
        Reference::optional("decision_id", EntityKind::Decision, self.decision_id.as_ref())
            .into_iter()
            .collect()
    }

    /// New considerations always start open and undecided
    fn from_draft(draft: ConsiderationDraft, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: String::new(),
            title: sanitize_required("title", &draft.title)?,
            description: sanitize_optional("description", draft.description.as_deref())?,
            options: sanitize_options(&draft.options)?,
            status: ConsiderationStatus::Open,
            decision_id: None,
            metadata: Metadata::from_draft(draft.meta, now)?,
        })
    }

    fn apply_patch(&mut self, patch: ConsiderationPatch) -> Result<(), ValidationError> {
        let title = patch_required("title", patch.title.as_deref())?;
        let description = patch_optional("description", patch.description)?;
        let options = patch.options.as_deref().map(sanitize_options).transpose()?;
        let decision_id = patch_reference("decision_id", EntityKind::Decision, patch.decision_id)?;
        let mut metadata = self.metadata.clone();
        metadata.apply(patch.meta)?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(options) = options {
            self.options = options;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(decision_id) = decision_id {
            self.decision_id = decision_id;
        }
        self.metadata = metadata;
        Ok(())
    }
}

impl Consideration {
    /// Whether a decided consideration is missing its back-link
    #[must_use]
    pub fn missing_decision_link(&self) -> bool {
        self.status == ConsiderationStatus::Decided && self.decision_id.is_none()
    }
}

/// Patch applied to a consideration when a decision settles it
#[must_use]
pub(crate) fn decided_by(decision_id: &str) -> ConsiderationPatch {
    ConsiderationPatch {
        status: Some(ConsiderationStatus::Decided),
        decision_id: Some(Some(decision_id.to_string())),
        ..ConsiderationPatch::default()
    }
}
