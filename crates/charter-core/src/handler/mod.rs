//! Per-kind handlers and the type-erased surface the registry exposes
//!
//! [`EntityHandler`] is the typed contract (`add / list / get / update /
//! delete`) one handler implements for its record type. [`DynHandler`] is the
//! object-safe view over the tagged [`Entity`] variants; every
//! `EntityHandler` gets it for free, and a payload of the wrong variant is a
//! [`CharterError::KindMismatch`].

mod effects;
mod standard;

pub use effects::{CreateEffect, MarkConsiderationDecided};
pub use standard::StandardHandler;

use crate::collection::Scanned;
use crate::error::{CharterError, Result};
use crate::model::{Entity, EntityDraft, EntityPatch, Record};
use async_trait::async_trait;
use charter_identity::EntityKind;
use charter_storage::CancellationToken;

/// Status filter and paging for `list`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Keep only records whose status has this name
    pub status: Option<String>,
    /// Maximum number of records returned
    pub limit: Option<usize>,
    /// Records skipped after filtering
    pub offset: usize,
}

impl ListFilter {
    /// Everything
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Only records in `status`
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Filter, then page
    #[must_use]
    pub fn apply<R: Record>(&self, records: Vec<R>) -> Vec<R> {
        records
            .into_iter()
            .filter(|r| match &self.status {
                Some(status) => r.status_label() == Some(status.as_str()),
                None => true,
            })
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

/// Typed operations of one record kind
#[async_trait]
pub trait EntityHandler: Send + Sync + 'static {
    type Record: Record;

    /// Kind served by this handler
    fn kind(&self) -> EntityKind {
        <Self::Record as Record>::KIND
    }

    /// Validate, assign an id and store a new record
    async fn add(
        &self,
        cancel: &CancellationToken,
        draft: <Self::Record as Record>::Draft,
    ) -> Result<Self::Record>;

    /// Stored records matching `filter`
    async fn list(
        &self,
        cancel: &CancellationToken,
        filter: &ListFilter,
    ) -> Result<Vec<Self::Record>>;

    /// Record `id`
    ///
    /// # Errors
    /// [`CharterError::NotFound`] when missing.
    async fn get(&self, cancel: &CancellationToken, id: &str) -> Result<Self::Record>;

    /// Merge `patch` into record `id`
    async fn update(
        &self,
        cancel: &CancellationToken,
        id: &str,
        patch: <Self::Record as Record>::Patch,
    ) -> Result<Self::Record>;

    /// Remove record `id`
    async fn delete(&self, cancel: &CancellationToken, id: &str) -> Result<()>;

    /// Every stored record with its file, keeping undecodable ones
    async fn scan(&self, cancel: &CancellationToken) -> Result<Vec<Scanned<Self::Record>>>;
}

/// Object-safe handler over tagged entity variants
#[async_trait]
pub trait DynHandler: Send + Sync {
    /// Registry name
    fn type_name(&self) -> &'static str;

    fn entity_kind(&self) -> EntityKind;

    async fn add_entity(&self, cancel: &CancellationToken, draft: EntityDraft) -> Result<Entity>;

    async fn list_entities(
        &self,
        cancel: &CancellationToken,
        filter: &ListFilter,
    ) -> Result<Vec<Entity>>;

    async fn get_entity(&self, cancel: &CancellationToken, id: &str) -> Result<Entity>;

    async fn update_entity(
        &self,
        cancel: &CancellationToken,
        id: &str,
        patch: EntityPatch,
    ) -> Result<Entity>;

    async fn delete_entity(&self, cancel: &CancellationToken, id: &str) -> Result<()>;

    async fn scan_entities(&self, cancel: &CancellationToken) -> Result<Vec<Scanned<Entity>>>;
}

#[async_trait]
impl<H: EntityHandler> DynHandler for H {
    fn type_name(&self) -> &'static str {
        EntityHandler::kind(self).name()
    }

    fn entity_kind(&self) -> EntityKind {
        EntityHandler::kind(self)
    }

    async fn add_entity(&self, cancel: &CancellationToken, draft: EntityDraft) -> Result<Entity> {
        let actual = draft.kind();
        let draft = <H::Record as Record>::Draft::try_from(draft)
            .map_err(|_| mismatch(EntityHandler::kind(self), actual))?;
        Ok(self.add(cancel, draft).await?.into())
    }

    async fn list_entities(
        &self,
        cancel: &CancellationToken,
        filter: &ListFilter,
    ) -> Result<Vec<Entity>> {
        Ok(self
            .list(cancel, filter)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn get_entity(&self, cancel: &CancellationToken, id: &str) -> Result<Entity> {
        Ok(self.get(cancel, id).await?.into())
    }

    async fn update_entity(
        &self,
        cancel: &CancellationToken,
        id: &str,
        patch: EntityPatch,
    ) -> Result<Entity> {
        let actual = patch.kind();
        let patch = <H::Record as Record>::Patch::try_from(patch)
            .map_err(|_| mismatch(EntityHandler::kind(self), actual))?;
        Ok(self.update(cancel, id, patch).await?.into())
    }

    async fn delete_entity(&self, cancel: &CancellationToken, id: &str) -> Result<()> {
        self.delete(cancel, id).await
    }

    async fn scan_entities(&self, cancel: &CancellationToken) -> Result<Vec<Scanned<Entity>>> {
        Ok(self
            .scan(cancel)
            .await?
            .into_iter()
            .map(|s| s.map(Into::into))
            .collect())
    }
}

fn mismatch(expected: EntityKind, actual: EntityKind) -> CharterError {
    CharterError::KindMismatch { expected, actual }
}
