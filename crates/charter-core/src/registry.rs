//! Type-name registry of handlers
//!
//! Callers address kinds by name (`"risk"`, `"task"`, ...) and pass tagged
//! [`EntityDraft`] / [`EntityPatch`] values; they never branch on concrete
//! handler types. [`RegistryReferences`] lets handlers look each other up
//! through the registry for integrity checks without owning it.

use crate::error::{CharterError, Result};
use crate::handler::{DynHandler, ListFilter};
use crate::integrity::{PopulationSource, ReferenceCheck, ReferenceChecker};
use crate::model::{Entity, EntityDraft, EntityPatch};
use async_trait::async_trait;
use charter_identity::{EntityKind, ValidationError};
use charter_storage::CancellationToken;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, Weak};

/// Handlers keyed by type name
#[derive(Default)]
pub struct Registry {
    handlers: BTreeMap<&'static str, Arc<dyn DynHandler>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under its type name, returning any handler it replaces
    pub fn register(&mut self, handler: Arc<dyn DynHandler>) -> Option<Arc<dyn DynHandler>> {
        let name = handler.type_name();
        tracing::debug!(type_name = name, "registered handler");
        self.handlers.insert(name, handler)
    }

    /// Handler registered for `kind`
    #[must_use]
    pub fn handler(&self, kind: EntityKind) -> Option<Arc<dyn DynHandler>> {
        self.handlers.get(kind.name()).cloned()
    }

    /// Handler registered as `type_name`
    ///
    /// # Errors
    /// [`ValidationError::UnknownKind`] for names nothing is registered under.
    pub fn get(&self, type_name: &str) -> Result<Arc<dyn DynHandler>> {
        self.handlers
            .get(type_name)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownKind(type_name.to_string()).into())
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    /// Registered handlers, by type name
    pub fn handlers(&self) -> impl Iterator<Item = &Arc<dyn DynHandler>> {
        self.handlers.values()
    }

    /// `Add` on the handler for `type_name`
    ///
    /// # Errors
    /// Unknown type, [`CharterError::KindMismatch`], or the handler's error.
    pub async fn add(
        &self,
        cancel: &CancellationToken,
        type_name: &str,
        draft: EntityDraft,
    ) -> Result<Entity> {
        self.get(type_name)?.add_entity(cancel, draft).await
    }

    /// `List` on the handler for `type_name`
    ///
    /// # Errors
    /// Unknown type or the handler's error.
    pub async fn list(
        &self,
        cancel: &CancellationToken,
        type_name: &str,
        filter: &ListFilter,
    ) -> Result<Vec<Entity>> {
        self.get(type_name)?.list_entities(cancel, filter).await
    }

    /// `Get` on the handler for `type_name`
    ///
    /// # Errors
    /// Unknown type or the handler's error.
    pub async fn get_entity(
        &self,
        cancel: &CancellationToken,
        type_name: &str,
        id: &str,
    ) -> Result<Entity> {
        self.get(type_name)?.get_entity(cancel, id).await
    }

    /// `Update` on the handler for `type_name`
    ///
    /// # Errors
    /// Unknown type, [`CharterError::KindMismatch`], or the handler's error.
    pub async fn update(
        &self,
        cancel: &CancellationToken,
        type_name: &str,
        id: &str,
        patch: EntityPatch,
    ) -> Result<Entity> {
        self.get(type_name)?.update_entity(cancel, id, patch).await
    }

    /// `Delete` on the handler for `type_name`
    ///
    /// # Errors
    /// Unknown type or the handler's error.
    pub async fn delete(&self, cancel: &CancellationToken, type_name: &str, id: &str) -> Result<()> {
        self.get(type_name)?.delete_entity(cancel, id).await
    }
}

/// Integrity lookups routed through a registry
///
/// Holds the registry weakly; handlers live inside the registry they check
/// against. Until [`RegistryReferences::bind`] is called, or once the
/// registry is gone, every lookup is [`ReferenceCheck::Unchecked`].
#[derive(Debug, Default)]
pub struct RegistryReferences {
    registry: OnceLock<Weak<Registry>>,
}

impl RegistryReferences {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route lookups to `registry`; `false` if already bound
    pub fn bind(&self, registry: &Arc<Registry>) -> bool {
        self.registry.set(Arc::downgrade(registry)).is_ok()
    }

    fn handler(&self, kind: EntityKind) -> Option<Arc<dyn DynHandler>> {
        let registry = self.registry.get()?.upgrade()?;
        registry.handler(kind)
    }
}

#[async_trait]
impl ReferenceChecker for RegistryReferences {
    async fn check(
        &self,
        cancel: &CancellationToken,
        kind: EntityKind,
        id: &str,
    ) -> Result<ReferenceCheck> {
        let Some(handler) = self.handler(kind) else {
            return Ok(ReferenceCheck::Unchecked);
        };
        match handler.get_entity(cancel, id).await {
            Ok(_) => Ok(ReferenceCheck::Verified),
            Err(CharterError::Validation(_)) => Err(CharterError::not_found(kind, id)),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl PopulationSource for RegistryReferences {
    async fn population(
        &self,
        cancel: &CancellationToken,
        kind: EntityKind,
    ) -> Result<Option<Vec<Entity>>> {
        let Some(handler) = self.handler(kind) else {
            return Ok(None);
        };
        Ok(Some(handler.list_entities(cancel, &ListFilter::all()).await?))
    }
}
