//! The handler shared by every file-backed record kind

use super::{CreateEffect, EntityHandler, ListFilter};
use crate::collection::{Collection, Scanned};
use crate::context::StoreContext;
use crate::error::{CharterError, Result};
use crate::integrity::{
    ensure_mutable, ensure_unreferenced, validate_changed_references, Integrity,
};
use crate::model::Record;
use crate::mutation::IdCounters;
use async_trait::async_trait;
use charter_identity::{mint_hashed, IdScheme};
use charter_storage::{checkpoint, CancellationToken};
use chrono::Utc;
use std::sync::Arc;

/// Fresh hashed ids tried before giving up on collisions
const MINT_ATTEMPTS: usize = 8;

/// Add / list / get / update / delete for one record kind
///
/// Forward reference checks run on create and on every changed reference
/// field; deletes are refused for immutable kinds and while dependents point
/// here. An optional [`CreateEffect`] runs after a create and undoes the
/// create if it fails.
pub struct StandardHandler<R: Record> {
    collection: Collection<R>,
    counters: Arc<IdCounters>,
    integrity: Integrity,
    effect: Option<Arc<dyn CreateEffect<R>>>,
}

impl<R: Record> std::fmt::Debug for StandardHandler<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardHandler")
            .field("kind", &R::KIND)
            .field("effect", &self.effect.is_some())
            .finish_non_exhaustive()
    }
}

impl<R: Record> StandardHandler<R> {
    #[must_use]
    pub fn new(ctx: &StoreContext, integrity: Integrity) -> Self {
        Self {
            collection: Collection::new(ctx.files.clone(), Arc::clone(&ctx.locks)),
            counters: Arc::clone(&ctx.counters),
            integrity,
            effect: None,
        }
    }

    /// Run `effect` after every successful create
    #[must_use]
    pub fn with_effect(mut self, effect: Arc<dyn CreateEffect<R>>) -> Self {
        self.effect = Some(effect);
        self
    }

    async fn mint_id(&self, cancel: &CancellationToken) -> Result<String> {
        match R::KIND.id_scheme() {
            IdScheme::Singleton(id) => {
                if self.collection.contains(cancel, id).await? {
                    return Err(CharterError::AlreadyExists {
                        kind: R::KIND,
                        id: id.to_string(),
                    });
                }
                Ok(id.to_string())
            }
            IdScheme::Sequential(_) => self.counters.next_id(cancel, R::KIND).await,
            IdScheme::Hashed(_) => {
                let mut last = String::new();
                for _ in 0..MINT_ATTEMPTS {
                    let id = mint_hashed(R::KIND)?;
                    if !self.collection.contains(cancel, &id).await? {
                        return Ok(id);
                    }
                    tracing::debug!(kind = %R::KIND, id = %id, "minted id collided, retrying");
                    last = id;
                }
                Err(CharterError::AlreadyExists {
                    kind: R::KIND,
                    id: last,
                })
            }
        }
    }

    async fn roll_back(&self, id: &str) {
        // the create has to be undone even if the caller has gone away
        let cancel = CancellationToken::new();
        match self.collection.remove(&cancel, id).await {
            Ok(_) => tracing::info!(kind = %R::KIND, id, "rolled back create"),
            Err(e) => tracing::error!(kind = %R::KIND, id, error = %e, "failed to roll back create"),
        }
    }
}

#[async_trait]
impl<R: Record> EntityHandler for StandardHandler<R> {
    type Record = R;

    async fn add(&self, cancel: &CancellationToken, draft: R::Draft) -> Result<R> {
        checkpoint(cancel)?;
        let mut record = R::from_draft(draft, Utc::now())?;

        validate_changed_references(
            self.integrity.references.as_ref(),
            cancel,
            &[],
            &record.references(),
        )
        .await?;
        if let Some(effect) = &self.effect {
            effect.prepare(cancel, &record).await?;
        }

        let id = self.mint_id(cancel).await?;
        record.set_id(id);
        self.collection.insert(cancel, &record).await?;

        if let Some(effect) = &self.effect {
            if let Err(err) = effect.apply(cancel, &record).await {
                tracing::warn!(kind = %R::KIND, id = record.id(), error = %err, "create effect failed");
                self.roll_back(record.id()).await;
                return Err(err);
            }
        }

        tracing::info!(kind = %R::KIND, id = record.id(), "created record");
        Ok(record)
    }

    async fn list(&self, cancel: &CancellationToken, filter: &ListFilter) -> Result<Vec<R>> {
        let records = self.collection.load_all(cancel).await?;
        tracing::debug!(kind = %R::KIND, total = records.len(), "listed records");
        Ok(filter.apply(records))
    }

    async fn get(&self, cancel: &CancellationToken, id: &str) -> Result<R> {
        checkpoint(cancel)?;
        self.collection
            .load(cancel, id)
            .await?
            .ok_or_else(|| CharterError::not_found(R::KIND, id))
    }

    async fn update(&self, cancel: &CancellationToken, id: &str, patch: R::Patch) -> Result<R> {
        ensure_mutable(R::KIND, "update")?;
        let current = self.get(cancel, id).await?;

        let mut next = current.clone();
        next.apply_patch(patch)?;
        next.metadata_mut().updated_at = Utc::now();

        validate_changed_references(
            self.integrity.references.as_ref(),
            cancel,
            &current.references(),
            &next.references(),
        )
        .await?;

        self.collection.replace(cancel, &next).await?;
        tracing::info!(kind = %R::KIND, id, "updated record");
        Ok(next)
    }

    async fn delete(&self, cancel: &CancellationToken, id: &str) -> Result<()> {
        ensure_mutable(R::KIND, "delete")?;
        if !self.collection.contains(cancel, id).await? {
            return Err(CharterError::not_found(R::KIND, id));
        }

        ensure_unreferenced(self.integrity.population.as_ref(), cancel, R::KIND, id).await?;

        if !self.collection.remove(cancel, id).await? {
            return Err(CharterError::not_found(R::KIND, id));
        }
        tracing::info!(kind = %R::KIND, id, "deleted record");
        Ok(())
    }

    async fn scan(&self, cancel: &CancellationToken) -> Result<Vec<Scanned<R>>> {
        self.collection.scan(cancel).await
    }
}
