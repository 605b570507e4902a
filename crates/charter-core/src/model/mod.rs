//! Typed entity model
//!
//! Each entity kind is a concrete record struct implementing [`Record`], with
//! a creation input (`Draft`) and a partial update (`Patch`) whose fields are
//! all optional: only supplied fields change, and each is sanitized before it
//! is merged. The closed set of kinds is also available as the tagged enums
//! [`Entity`], [`EntityDraft`] and [`EntityPatch`] for the type-name registry.

use charter_identity::sanitize::{sanitize_optional, sanitize_owner, sanitize_required, sanitize_tags};
use charter_identity::{validate_id, EntityKind, ValidationError};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Declare a lifecycle status enum with stable string names
macro_rules! status_enum {
    (
        $(#[$meta:meta])*
        $name:ident($field:literal) { $default:ident => $default_str:literal $(, $variant:ident => $str:literal)* $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            #[default]
            #[serde(rename = $default_str)]
            $default,
            $(
                #[serde(rename = $str)]
                $variant,
            )*
        }

        impl $name {
            /// Stable lowercase name
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    Self::$default => $default_str,
                    $(Self::$variant => $str,)*
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = charter_identity::ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $default_str => Ok(Self::$default),
                    $($str => Ok(Self::$variant),)*
                    other => Err(charter_identity::ValidationError::invalid(
                        $field,
                        format!("unknown value {other:?}"),
                    )),
                }
            }
        }
    };
}

mod actor;
mod approval;
mod consideration;
mod decision;
mod deliverable;
mod objective;
mod risk;
mod task;
mod vision;

pub use actor::{Actor, ActorDraft, ActorPatch};
pub use approval::{ActionType, ApprovalDraft, ApprovalResolution, ApprovalStatus, PendingApproval};
pub(crate) use consideration::decided_by;
pub use consideration::{Consideration, ConsiderationDraft, ConsiderationPatch, ConsiderationStatus};
pub use decision::{Decision, DecisionDraft, DecisionPatch};
pub use deliverable::{Deliverable, DeliverableDraft, DeliverablePatch, DeliverableStatus};
pub use objective::{Objective, ObjectiveDraft, ObjectivePatch, ObjectiveStatus};
pub use risk::{risk_score, Level, Risk, RiskDraft, RiskPatch, RiskStatus};
pub use task::{Task, TaskDraft, TaskPatch, TaskStatus, MAX_PROGRESS};
pub use vision::{Vision, VisionDraft, VisionPatch};

/// Bookkeeping carried by every record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Metadata {
    /// Validate creation input into fresh metadata stamped at `now`
    ///
    /// # Errors
    /// [`ValidationError`] for bad owner or tags.
    pub fn from_draft(draft: MetaDraft, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            created_at: now,
            updated_at: now,
            owner: draft.owner.as_deref().map(sanitize_owner).transpose()?,
            tags: sanitize_tags(&draft.tags)?,
        })
    }

    /// Merge the supplied metadata fields
    ///
    /// # Errors
    /// [`ValidationError`] for bad owner or tags; nothing is changed on error.
    pub fn apply(&mut self, patch: MetaPatch) -> Result<(), ValidationError> {
        let owner = match patch.owner {
            Some(Some(owner)) => Some(Some(sanitize_owner(&owner)?)),
            Some(None) => Some(None),
            None => None,
        };
        let tags = patch.tags.as_deref().map(sanitize_tags).transpose()?;

        if let Some(owner) = owner {
            self.owner = owner;
        }
        if let Some(tags) = tags {
            self.tags = tags;
        }
        Ok(())
    }
}

/// Owner and tags supplied at creation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaDraft {
    pub owner: Option<String>,
    pub tags: Vec<String>,
}

impl MetaDraft {
    /// Draft metadata with an owner
    #[must_use]
    pub fn owned_by(owner: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
            tags: Vec::new(),
        }
    }

    /// Add tags
    #[must_use]
    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

/// Owner and tag changes; `None` leaves the field alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaPatch {
    /// `Some(None)` clears the owner
    pub owner: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

/// A foreign-key-like field naming another entity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Field name on the referencing record
    pub field: &'static str,
    /// Kind the field must resolve to
    pub kind: EntityKind,
    /// Referenced id
    pub id: String,
}

impl Reference {
    pub(crate) fn optional(
        field: &'static str,
        kind: EntityKind,
        id: Option<&String>,
    ) -> Option<Self> {
        id.filter(|id| !id.is_empty()).map(|id| Self {
            field,
            kind,
            id: id.clone(),
        })
    }
}

/// Sanitize a replacement for a required text field
pub(crate) fn patch_required(
    field: &str,
    value: Option<&str>,
) -> Result<Option<String>, ValidationError> {
    value.map(|v| sanitize_required(field, v)).transpose()
}

/// Sanitize a replacement for a clearable text field
pub(crate) fn patch_optional(
    field: &str,
    value: Option<Option<String>>,
) -> Result<Option<Option<String>>, ValidationError> {
    value
        .map(|v| sanitize_optional(field, v.as_deref()))
        .transpose()
}

/// Check a reference value against the referenced kind's id grammar
///
/// Blank input means "no reference".
pub(crate) fn reference_id(
    field: &'static str,
    kind: EntityKind,
    value: Option<&str>,
) -> Result<Option<String>, ValidationError> {
    let Some(id) = value.map(str::trim).filter(|id| !id.is_empty()) else {
        return Ok(None);
    };
    validate_id(kind, id)
        .map_err(|_| ValidationError::invalid(field, format!("{id:?} is not a valid {kind} id")))?;
    Ok(Some(id.to_string()))
}

/// Like [`reference_id`] for a field that must be set
pub(crate) fn required_reference(
    field: &'static str,
    kind: EntityKind,
    value: &str,
) -> Result<String, ValidationError> {
    reference_id(field, kind, Some(value))?.ok_or_else(|| ValidationError::Empty {
        field: field.to_string(),
    })
}

/// Validate a clearable reference replacement
pub(crate) fn patch_reference(
    field: &'static str,
    kind: EntityKind,
    value: Option<Option<String>>,
) -> Result<Option<Option<String>>, ValidationError> {
    value
        .map(|v| reference_id(field, kind, v.as_deref()))
        .transpose()
}

/// A persisted entity type
pub trait Record:
    Serialize + DeserializeOwned + Clone + Debug + Into<Entity> + Send + Sync + 'static
{
    /// Kind of every instance
    const KIND: EntityKind;
    /// Creation input
    type Draft: TryFrom<EntityDraft, Error = EntityDraft> + Send + Sync + 'static;
    /// Partial update
    type Patch: TryFrom<EntityPatch, Error = EntityPatch> + Send + Sync + 'static;

    /// Record id
    fn id(&self) -> &str;

    /// Assign the minted id
    fn set_id(&mut self, id: String);

    /// Bookkeeping block
    fn metadata(&self) -> &Metadata;

    /// Mutable bookkeeping block
    fn metadata_mut(&mut self) -> &mut Metadata;

    /// Lifecycle status name, for list filters
    fn status_label(&self) -> Option<&'static str>;

    /// Non-empty reference fields
    fn references(&self) -> Vec<Reference>;

    /// Validate and sanitize a draft into a record (id assigned afterwards)
    ///
    /// # Errors
    /// [`ValidationError`] scoped to the offending field.
    fn from_draft(draft: Self::Draft, now: DateTime<Utc>) -> Result<Self, ValidationError>;

    /// Validate and merge the supplied fields
    ///
    /// # Errors
    /// [`ValidationError`] scoped to the offending field; the record is left
    /// unchanged on error.
    fn apply_patch(&mut self, patch: Self::Patch) -> Result<(), ValidationError>;
}

/// Tagged variants over the closed set of kinds
macro_rules! entity_variants {
    ($($variant:ident => $record:ty, $draft:ty, $patch:ty;)+) => {
        /// Any record, tagged by kind
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "type", rename_all = "snake_case")]
        pub enum Entity {
            $($variant($record),)+
        }

        /// Creation input for any kind
        #[derive(Debug, Clone)]
        pub enum EntityDraft {
            $($variant($draft),)+
        }

        /// Partial update for any kind
        #[derive(Debug, Clone)]
        pub enum EntityPatch {
            $($variant($patch),)+
        }

        impl Entity {
            /// Kind of the wrapped record
            #[must_use]
            pub fn kind(&self) -> EntityKind {
                match self {
                    $(Self::$variant(_) => <$record as Record>::KIND,)+
                }
            }

            /// Id of the wrapped record
            #[must_use]
            pub fn id(&self) -> &str {
                match self {
                    $(Self::$variant(r) => r.id(),)+
                }
            }

            /// Metadata of the wrapped record
            #[must_use]
            pub fn metadata(&self) -> &Metadata {
                match self {
                    $(Self::$variant(r) => r.metadata(),)+
                }
            }

            /// References of the wrapped record
            #[must_use]
            pub fn references(&self) -> Vec<Reference> {
                match self {
                    $(Self::$variant(r) => r.references(),)+
                }
            }

            /// Status name of the wrapped record
            #[must_use]
            pub fn status_label(&self) -> Option<&'static str> {
                match self {
                    $(Self::$variant(r) => r.status_label(),)+
                }
            }
        }

        impl EntityDraft {
            /// Kind the draft creates
            #[must_use]
            pub fn kind(&self) -> EntityKind {
                match self {
                    $(Self::$variant(_) => <$record as Record>::KIND,)+
                }
            }
        }

        impl EntityPatch {
            /// Kind the patch applies to
            #[must_use]
            pub fn kind(&self) -> EntityKind {
                match self {
                    $(Self::$variant(_) => <$record as Record>::KIND,)+
                }
            }
        }

        $(
            impl From<$record> for Entity {
                fn from(record: $record) -> Self {
                    Self::$variant(record)
                }
            }

            impl TryFrom<Entity> for $record {
                type Error = Entity;

                fn try_from(entity: Entity) -> Result<Self, Entity> {
                    match entity {
                        Entity::$variant(record) => Ok(record),
                        other => Err(other),
                    }
                }
            }

            impl From<$draft> for EntityDraft {
                fn from(draft: $draft) -> Self {
                    Self::$variant(draft)
                }
            }

            impl TryFrom<EntityDraft> for $draft {
                type Error = EntityDraft;

                fn try_from(draft: EntityDraft) -> Result<Self, EntityDraft> {
                    match draft {
                        EntityDraft::$variant(draft) => Ok(draft),
                        other => Err(other),
                    }
                }
            }

            impl From<$patch> for EntityPatch {
                fn from(patch: $patch) -> Self {
                    Self::$variant(patch)
                }
            }

            impl TryFrom<EntityPatch> for $patch {
                type Error = EntityPatch;

                fn try_from(patch: EntityPatch) -> Result<Self, EntityPatch> {
                    match patch {
                        EntityPatch::$variant(patch) => Ok(patch),
                        other => Err(other),
                    }
                }
            }
        )+
    };
}

entity_variants! {
    Vision => Vision, VisionDraft, VisionPatch;
    Objective => Objective, ObjectiveDraft, ObjectivePatch;
    Deliverable => Deliverable, DeliverableDraft, DeliverablePatch;
    Risk => Risk, RiskDraft, RiskPatch;
    Consideration => Consideration, ConsiderationDraft, ConsiderationPatch;
    Decision => Decision, DecisionDraft, DecisionPatch;
    Task => Task, TaskDraft, TaskPatch;
    Actor => Actor, ActorDraft, ActorPatch;
    Approval => PendingApproval, ApprovalDraft, ApprovalResolution;
}
