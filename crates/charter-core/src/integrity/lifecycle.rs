//! Lifecycle rules: immutability and cascade protection

use super::references::PopulationSource;
use crate::error::{CharterError, Result};
use charter_identity::EntityKind;
use charter_storage::{checkpoint, CancellationToken};

/// Refuse `operation` on immutable kinds
///
/// The rule belongs to the kind, not to any instance state.
///
/// # Errors
/// [`CharterError::Immutable`].
pub fn ensure_mutable(kind: EntityKind, operation: &'static str) -> Result<()> {
    if kind.is_immutable() {
        return Err(CharterError::Immutable { kind, operation });
    }
    Ok(())
}

/// A kind whose records may point at another kind through `field`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    pub dependent: EntityKind,
    pub field: &'static str,
}

const OBJECTIVE_DEPENDENTS: &[Dependency] = &[
    Dependency {
        dependent: EntityKind::Deliverable,
        field: "objective_id",
    },
    Dependency {
        dependent: EntityKind::Risk,
        field: "objective_id",
    },
];

const DELIVERABLE_DEPENDENTS: &[Dependency] = &[Dependency {
    dependent: EntityKind::Task,
    field: "deliverable_id",
}];

const ACTOR_DEPENDENTS: &[Dependency] = &[Dependency {
    dependent: EntityKind::Task,
    field: "assignee",
}];

const CONSIDERATION_DEPENDENTS: &[Dependency] = &[Dependency {
    dependent: EntityKind::Decision,
    field: "consideration_id",
}];

/// Kinds that block deletion of `kind` while they reference it
#[must_use]
pub fn dependents_of(kind: EntityKind) -> &'static [Dependency] {
    match kind {
        EntityKind::Objective => OBJECTIVE_DEPENDENTS,
        EntityKind::Deliverable => DELIVERABLE_DEPENDENTS,
        EntityKind::Actor => ACTOR_DEPENDENTS,
        EntityKind::Consideration => CONSIDERATION_DEPENDENTS,
        _ => &[],
    }
}

/// Fail if any live record still references `kind`/`id`
///
/// Linear scan of each dependent kind's full population; there is no index.
/// A dependent kind the source cannot provide is skipped.
///
/// # Errors
/// [`CharterError::CascadeProtected`] naming every referrer.
pub async fn ensure_unreferenced(
    source: &dyn PopulationSource,
    cancel: &CancellationToken,
    kind: EntityKind,
    id: &str,
) -> Result<()> {
    let mut referenced_by = Vec::new();

    for dependency in dependents_of(kind) {
        checkpoint(cancel)?;
        let Some(population) = source.population(cancel, dependency.dependent).await? else {
            tracing::debug!(
                target_kind = %kind,
                dependent = %dependency.dependent,
                "cascade scan skipped: dependent kind not available"
            );
            continue;
        };

        referenced_by.extend(
            population
                .iter()
                .filter(|entity| {
                    entity
                        .references()
                        .iter()
                        .any(|r| r.field == dependency.field && r.kind == kind && r.id == id)
                })
                .map(|entity| format!("{} {}", entity.kind(), entity.id())),
        );
    }

    if referenced_by.is_empty() {
        Ok(())
    } else {
        Err(CharterError::CascadeProtected {
            kind,
            id: id.to_string(),
            referenced_by,
        })
    }
}
