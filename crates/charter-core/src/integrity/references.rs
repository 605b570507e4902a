//! Forward reference checks
//!
//! A non-empty reference must name an existing record of the expected kind
//! when it is written. The lookup goes through a [`ReferenceChecker`]; when
//! no checker can answer (kind not wired in, integrity disabled) the result
//! is [`ReferenceCheck::Unchecked`], never a silent pass.

use crate::error::Result;
use crate::model::{Entity, Reference};
use async_trait::async_trait;
use charter_identity::EntityKind;
use charter_storage::CancellationToken;

/// Outcome of a reference lookup that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceCheck {
    /// Target exists
    Verified,
    /// No lookup was possible; integrity unknown
    Unchecked,
}

/// Resolves references to existing records
#[async_trait]
pub trait ReferenceChecker: Send + Sync {
    /// Look up `id` of `kind`
    ///
    /// # Errors
    /// [`crate::CharterError::NotFound`] when the target is missing.
    async fn check(
        &self,
        cancel: &CancellationToken,
        kind: EntityKind,
        id: &str,
    ) -> Result<ReferenceCheck>;
}

/// Full record population per kind, for backward scans
#[async_trait]
pub trait PopulationSource: Send + Sync {
    /// Every live record of `kind`, or `None` when the kind is not available
    async fn population(
        &self,
        cancel: &CancellationToken,
        kind: EntityKind,
    ) -> Result<Option<Vec<Entity>>>;
}

/// Integrity collaborator that never checks anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullIntegrity;

#[async_trait]
impl ReferenceChecker for NullIntegrity {
    async fn check(
        &self,
        _cancel: &CancellationToken,
        _kind: EntityKind,
        _id: &str,
    ) -> Result<ReferenceCheck> {
        Ok(ReferenceCheck::Unchecked)
    }
}

#[async_trait]
impl PopulationSource for NullIntegrity {
    async fn population(
        &self,
        _cancel: &CancellationToken,
        _kind: EntityKind,
    ) -> Result<Option<Vec<Entity>>> {
        Ok(None)
    }
}

/// Check one reference
///
/// # Errors
/// NotFound for a dangling reference, or whatever the lookup fails with.
pub async fn validate_reference(
    checker: &dyn ReferenceChecker,
    cancel: &CancellationToken,
    reference: &Reference,
) -> Result<ReferenceCheck> {
    let outcome = checker.check(cancel, reference.kind, &reference.id).await?;
    if outcome == ReferenceCheck::Unchecked {
        tracing::debug!(
            field = reference.field,
            kind = %reference.kind,
            id = %reference.id,
            "reference not checked: no collaborator"
        );
    }
    Ok(outcome)
}

/// Check the references in `after` that are new or changed relative to `before`
///
/// Returns the outcome per checked reference.
///
/// # Errors
/// The first failing lookup.
pub async fn validate_changed_references(
    checker: &dyn ReferenceChecker,
    cancel: &CancellationToken,
    before: &[Reference],
    after: &[Reference],
) -> Result<Vec<(Reference, ReferenceCheck)>> {
    let mut checked = Vec::new();
    for reference in after.iter().filter(|r| !before.contains(r)) {
        let outcome = validate_reference(checker, cancel, reference).await?;
        checked.push((reference.clone(), outcome));
    }
    Ok(checked)
}
