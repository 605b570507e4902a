//! Entity kinds and their storage shape
//!
//! Every persisted record belongs to exactly one [`EntityKind`]. The kind fixes
//! the identifier scheme, the on-disk layout and whether instances may change
//! after creation.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Closed set of entity kinds known to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Project vision (singleton)
    Vision,
    /// Objective (sequential id)
    Objective,
    /// Deliverable bound to an objective (sequential id)
    Deliverable,
    /// Risk register entry
    Risk,
    /// Open question awaiting a decision
    Consideration,
    /// Recorded decision (immutable)
    Decision,
    /// Unit of work
    Task,
    /// Person or team participating in the project
    Actor,
    /// Proposed mutation awaiting approval
    Approval,
}

/// How identifiers are minted and validated for a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdScheme {
    /// Exactly one instance with a fixed id
    Singleton(&'static str),
    /// `prefix-NNN`, minted from a per-kind counter
    Sequential(&'static str),
    /// `prefix-` + 8 lowercase hex characters derived from a UUID
    Hashed(&'static str),
}

impl IdScheme {
    /// Prefix (or fixed id for singletons)
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Singleton(p) | Self::Sequential(p) | Self::Hashed(p) => p,
        }
    }
}

/// Where instances of a kind live relative to the store root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One fixed file regardless of id
    Singleton(&'static str),
    /// `dir/<id>.yaml`, one file per instance
    Directory(&'static str),
    /// One shared file holding an array of instances
    Array(&'static str),
    /// Pending queue file plus one permanent file per resolved instance
    Queue,
}

impl EntityKind {
    /// All kinds, in dependency-friendly order
    pub const ALL: [EntityKind; 9] = [
        Self::Vision,
        Self::Objective,
        Self::Deliverable,
        Self::Risk,
        Self::Consideration,
        Self::Decision,
        Self::Task,
        Self::Actor,
        Self::Approval,
    ];

    /// Registry name of the kind (`Type()` of its handler)
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Vision => "vision",
            Self::Objective => "objective",
            Self::Deliverable => "deliverable",
            Self::Risk => "risk",
            Self::Consideration => "consideration",
            Self::Decision => "decision",
            Self::Task => "task",
            Self::Actor => "actor",
            Self::Approval => "approval",
        }
    }

    /// Identifier scheme for the kind
    #[must_use]
    pub fn id_scheme(self) -> IdScheme {
        match self {
            Self::Vision => IdScheme::Singleton("vision"),
            Self::Objective => IdScheme::Sequential("obj"),
            Self::Deliverable => IdScheme::Sequential("del"),
            Self::Risk => IdScheme::Hashed("risk"),
            Self::Consideration => IdScheme::Hashed("cons"),
            Self::Decision => IdScheme::Hashed("dec"),
            Self::Task => IdScheme::Hashed("task"),
            Self::Actor => IdScheme::Hashed("actor"),
            Self::Approval => IdScheme::Hashed("apr"),
        }
    }

    /// Storage layout for the kind
    #[must_use]
    pub fn layout(self) -> Layout {
        match self {
            Self::Vision => Layout::Singleton("vision"),
            Self::Objective => Layout::Directory("objectives"),
            Self::Deliverable => Layout::Directory("deliverables"),
            Self::Risk => Layout::Directory("risks"),
            Self::Consideration => Layout::Directory("considerations"),
            Self::Decision => Layout::Directory("decisions"),
            Self::Task => Layout::Array("tasks"),
            Self::Actor => Layout::Array("actors"),
            Self::Approval => Layout::Queue,
        }
    }

    /// Whether instances can never be updated or deleted
    ///
    /// A property of the kind, not of any instance state.
    #[inline]
    #[must_use]
    pub fn is_immutable(self) -> bool {
        matches!(self, Self::Decision)
    }

    /// Whether ids are minted from the sequential counter
    #[inline]
    #[must_use]
    pub fn is_sequential(self) -> bool {
        matches!(self.id_scheme(), IdScheme::Sequential(_))
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| ValidationError::UnknownKind(s.to_string()))
    }
}
