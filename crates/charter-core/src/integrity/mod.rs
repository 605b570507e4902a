//! Referential integrity and lifecycle rules
//!
//! - forward checks: a written reference must resolve ([`references`])
//! - backward checks: no delete while dependents point here ([`lifecycle`])
//! - immutability: a property of the kind ([`lifecycle`])
//! - lint: read-only self-consistency scan ([`lint`])

pub mod lifecycle;
pub mod lint;
pub mod references;

pub use lifecycle::{dependents_of, ensure_mutable, ensure_unreferenced, Dependency};
pub use lint::{LintFinding, LintFix, LintReport, Severity};
pub use references::{
    validate_changed_references, validate_reference, NullIntegrity, PopulationSource,
    ReferenceCheck, ReferenceChecker,
};

use std::sync::Arc;

/// Integrity collaborators a handler checks against
#[derive(Clone)]
pub struct Integrity {
    pub references: Arc<dyn ReferenceChecker>,
    pub population: Arc<dyn PopulationSource>,
}

impl Integrity {
    #[must_use]
    pub fn new(references: Arc<dyn ReferenceChecker>, population: Arc<dyn PopulationSource>) -> Self {
        Self {
            references,
            population,
        }
    }

    /// Both lookups answered by one collaborator
    #[must_use]
    pub fn shared<C>(collaborator: Arc<C>) -> Self
    where
        C: ReferenceChecker + PopulationSource + 'static,
    {
        Self {
            references: Arc::clone(&collaborator) as Arc<dyn ReferenceChecker>,
            population: collaborator,
        }
    }

    /// No checks at all: every lookup is "unchecked"
    #[must_use]
    pub fn disabled() -> Self {
        Self::shared(Arc::new(NullIntegrity))
    }
}

impl std::fmt::Debug for Integrity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Integrity").finish_non_exhaustive()
    }
}
