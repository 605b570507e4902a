//! Actors: people or agents tasks can be assigned to

use super::{patch_optional, patch_required, MetaDraft, MetaPatch, Metadata, Record, Reference};
use charter_identity::sanitize::{sanitize_optional, sanitize_required};
use charter_identity::{EntityKind, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default)]
pub struct ActorDraft {
    pub name: String,
    pub role: Option<String>,
    pub contact: Option<String>,
    pub meta: MetaDraft,
}

#[derive(Debug, Clone, Default)]
pub struct ActorPatch {
    pub name: Option<String>,
    pub role: Option<Option<String>>,
    pub contact: Option<Option<String>>,
    pub meta: MetaPatch,
}

impl Record for Actor {
    const KIND: EntityKind = EntityKind::Actor;
    type Draft = ActorDraft;
    type Patch = ActorPatch;

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

    fn from_draft(draft: ActorDraft, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: String::new(),
            name: sanitize_required("name", &draft.name)?,
            role: sanitize_optional("role", draft.role.as_deref())?,
            contact: sanitize_optional("contact", draft.contact.as_deref())?,
            metadata: Metadata::from_draft(draft.meta, now)?,
        })
    }

    fn apply_patch(&mut self, patch: ActorPatch) -> Result<(), ValidationError> {
        let name = patch_required("name", patch.name.as_deref())?;
        let role = patch_optional("role", patch.role)?;
        let contact = patch_optional("contact", patch.contact)?;
        let mut metadata = self.metadata.clone();
        metadata.apply(patch.meta)?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(role) = role {
            self.role = role;
        }
        if let Some(contact) = contact {
            self.contact = contact;
        }
        self.metadata = metadata;
        Ok(())
    }
}
