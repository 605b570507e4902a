//! Deliverables: sequentially numbered outputs of an objective

use super::{
    patch_optional, patch_required, required_reference, MetaDraft, MetaPatch, Metadata, Record,
    Reference,
};
use charter_identity::sanitize::{sanitize_optional, sanitize_required};
use charter_identity::{EntityKind, ValidationError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

status_enum! {
    /// Deliverable lifecycle
    DeliverableStatus("status") {
        Planned => "planned",
        InProgress => "in_progress",
        Delivered => "delivered",
        Cancelled => "cancelled",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deliverable {
    pub id: String,
    pub objective_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: DeliverableStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default)]
pub struct DeliverableDraft {
    pub objective_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<DeliverableStatus>,
    pub due_date: Option<NaiveDate>,
    pub meta: MetaDraft,
}

#[derive(Debug, Clone, Default)]
pub struct DeliverablePatch {
    /// Required reference: can be moved but not cleared
    pub objective_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<DeliverableStatus>,
    pub due_date: Option<Option<NaiveDate>>,
    pub meta: MetaPatch,
}

impl Record for Deliverable {
    const KIND: EntityKind = EntityKind::Deliverable;
    type Draft = DeliverableDraft;
    type Patch = DeliverablePatch;

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
        Reference::optional("objective_id", EntityKind::Objective, Some(&self.objective_id))
            .into_iter()
            .collect()
    }

    fn from_draft(draft: DeliverableDraft, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: String::new(),
            objective_id: required_reference(
                "objective_id",
                EntityKind::Objective,
                &draft.objective_id,
            )?,
            title: sanitize_required("title", &draft.title)?,
            description: sanitize_optional("description", draft.description.as_deref())?,
            status: draft.status.unwrap_or_default(),
            due_date: draft.due_date,
            metadata: Metadata::from_draft(draft.meta, now)?,
        })
    }

    fn apply_patch(&mut self, patch: DeliverablePatch) -> Result<(), ValidationError> {
        let objective_id = patch
            .objective_id
            .as_deref()
            .map(|id| required_reference("objective_id", EntityKind::Objective, id))
            .transpose()?;
        let title = patch_required("title", patch.title.as_deref())?;
        let description = patch_optional("description", patch.description)?;
        let mut metadata = self.metadata.clone();
        metadata.apply(patch.meta)?;

        if let Some(objective_id) = objective_id {
            self.objective_id = objective_id;
        }
        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        self.metadata = metadata;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objective_reference_is_required_and_well_formed() {
        let err = Deliverable::from_draft(
            DeliverableDraft {
                title: "Spec".into(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("objective_id"));

        let err = Deliverable::from_draft(
            DeliverableDraft {
                title: "Spec".into(),
                objective_id: "objective-1".into(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("objective_id"));
    }

    #[test]
    fn references_name_the_objective() {
        let deliverable = Deliverable::from_draft(
            DeliverableDraft {
                title: "Spec".into(),
                objective_id: "obj-002".into(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        let refs = deliverable.references();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, EntityKind::Objective);
        assert_eq!(refs[0].id, "obj-002");
    }
}
