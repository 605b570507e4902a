//! Approval queue
//!
//! Pending requests share one queue file. Resolving a request moves it to a
//! permanent file under `approvals/approved/` or `approvals/rejected/`. Every
//! read and write of the queue happens under the queue lock, so a concurrent
//! second resolution of the same id sees the first one's outcome and fails
//! with [`CharterError::ApprovalNotPending`].

use crate::collection::Scanned;
use crate::context::StoreContext;
use crate::error::{CharterError, Result};
use crate::handler::{EntityHandler, ListFilter};
use crate::model::{ApprovalDraft, ApprovalResolution, ApprovalStatus, PendingApproval, Record};
use crate::mutation::LockManager;
use async_trait::async_trait;
use charter_identity::{
    approval_outcome_dir, approval_outcome_path, approval_queue_path, id_from_file_name,
    mint_hashed, validate_id, EntityKind, Resolution,
};
use charter_storage::{checkpoint, CancellationToken, FileStore, StorageError};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;

const OUTCOMES: [Resolution; 2] = [Resolution::Approved, Resolution::Rejected];

/// The approval state machine over the queue and outcome files
#[derive(Debug)]
pub struct ApprovalQueue {
    files: FileStore,
    locks: Arc<LockManager>,
}

impl ApprovalQueue {
    #[must_use]
    pub fn new(ctx: &StoreContext) -> Self {
        Self {
            files: ctx.files.clone(),
            locks: Arc::clone(&ctx.locks),
        }
    }

    /// Append a new pending request
    ///
    /// # Errors
    /// Validation, lock, cancellation or storage failures.
    pub async fn create(
        &self,
        cancel: &CancellationToken,
        draft: ApprovalDraft,
    ) -> Result<PendingApproval> {
        checkpoint(cancel)?;
        let mut approval = PendingApproval::from_draft(draft, Utc::now())?;

        let queue_path = approval_queue_path();
        let _guard = self.locks.lock(cancel, &queue_path).await?;
        let mut queue = self.read_queue(cancel).await?;

        let mut id = mint_hashed(EntityKind::Approval)?;
        while queue.iter().any(|a| a.id == id) || self.find_resolved(cancel, &id).await?.is_some() {
            id = mint_hashed(EntityKind::Approval)?;
        }
        approval.set_id(id);

        queue.push(approval.clone());
        self.files.write(cancel, &queue_path, &queue).await?;

        tracing::info!(
            id = %approval.id,
            action = %approval.action,
            requested_by = %approval.requested_by,
            "queued approval request"
        );
        Ok(approval)
    }

    /// Approve pending request `id`
    ///
    /// # Errors
    /// As [`ApprovalQueue::resolve`].
    pub async fn approve(
        &self,
        cancel: &CancellationToken,
        id: &str,
        resolved_by: &str,
    ) -> Result<PendingApproval> {
        self.resolve(cancel, id, ApprovalResolution::approve(resolved_by))
            .await
    }

    /// Reject pending request `id`
    ///
    /// # Errors
    /// As [`ApprovalQueue::resolve`].
    pub async fn reject(
        &self,
        cancel: &CancellationToken,
        id: &str,
        resolved_by: &str,
    ) -> Result<PendingApproval> {
        self.resolve(cancel, id, ApprovalResolution::reject(resolved_by))
            .await
    }

    /// Move pending request `id` to its outcome
    ///
    /// Cancellation is honoured up to the first write. From then on the
    /// resolution runs to the end: the outcome file is written, the request
    /// leaves the queue, and if the queue cannot be rewritten the outcome
    /// file is removed again.
    ///
    /// # Errors
    /// - [`CharterError::ApprovalNotPending`] if `id` was already resolved
    /// - [`CharterError::NotFound`] if `id` is unknown
    /// - validation, lock, cancellation or storage failures
    pub async fn resolve(
        &self,
        cancel: &CancellationToken,
        id: &str,
        resolution: ApprovalResolution,
    ) -> Result<PendingApproval> {
        validate_id(EntityKind::Approval, id)?;
        checkpoint(cancel)?;

        let queue_path = approval_queue_path();
        let _guard = self.locks.lock(cancel, &queue_path).await?;
        let mut queue = self.read_queue(cancel).await?;

        let Some(position) = queue.iter().position(|a| a.id == id) else {
            return match self.find_resolved(cancel, id).await? {
                Some(resolved) => Err(CharterError::ApprovalNotPending {
                    id: id.to_string(),
                    current: resolved.status,
                }),
                None => Err(CharterError::not_found(EntityKind::Approval, id)),
            };
        };

        let outcome = resolution.outcome;
        let mut resolved = queue[position].clone();
        resolved.resolve(resolution, Utc::now())?;
        let outcome_path = approval_outcome_path(outcome, id)?;

        checkpoint(cancel)?;
        let committed = CancellationToken::new();
        self.files
            .write(&committed, &outcome_path, &resolved)
            .await?;

        queue.remove(position);
        if let Err(err) = self.files.write(&committed, &queue_path, &queue).await {
            if let Err(undo) = self.files.delete(&committed, &outcome_path).await {
                tracing::error!(id, error = %undo, "failed to remove outcome file after queue write failure");
            }
            return Err(err.into());
        }

        tracing::info!(
            id,
            status = %resolved.status,
            resolved_by = resolved.resolved_by.as_deref().unwrap_or_default(),
            "resolved approval"
        );
        Ok(resolved)
    }

    /// Request `id`, pending or resolved
    ///
    /// # Errors
    /// [`CharterError::NotFound`] if unknown.
    pub async fn get(&self, cancel: &CancellationToken, id: &str) -> Result<PendingApproval> {
        validate_id(EntityKind::Approval, id)?;
        let _guard = self.locks.lock(cancel, &approval_queue_path()).await?;

        if let Some(pending) = self.read_queue(cancel).await?.into_iter().find(|a| a.id == id) {
            return Ok(pending);
        }
        self.find_resolved(cancel, id)
            .await?
            .ok_or_else(|| CharterError::not_found(EntityKind::Approval, id))
    }

    /// Every request, optionally only those in `status`
    ///
    /// Pending requests come first in queue order, then approved, then
    /// rejected, each sorted by id.
    ///
    /// # Errors
    /// Lock, cancellation or storage failures.
    pub async fn list(
        &self,
        cancel: &CancellationToken,
        status: Option<ApprovalStatus>,
    ) -> Result<Vec<PendingApproval>> {
        let scanned = self.scan_locked(cancel).await?;
        let mut all = Vec::with_capacity(scanned.len());
        for entry in scanned {
            match entry.record {
                Ok(approval) => all.push(approval),
                Err(reason) => {
                    tracing::warn!(file = %entry.file.display(), %reason, "skipping unreadable approval");
                }
            }
        }
        Ok(all
            .into_iter()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .collect())
    }

    async fn scan_locked(&self, cancel: &CancellationToken) -> Result<Vec<Scanned<PendingApproval>>> {
        let queue_path = approval_queue_path();
        let _guard = self.locks.lock(cancel, &queue_path).await?;

        let mut scanned = Vec::new();
        match self.read_queue(cancel).await {
            Ok(queue) => scanned.extend(queue.into_iter().map(|a| Scanned {
                file: queue_path.clone(),
                record: Ok(a),
            })),
            Err(CharterError::Storage(StorageError::Decode { source, .. })) => scanned.push(Scanned {
                file: queue_path.clone(),
                record: Err(source.to_string()),
            }),
            Err(e) => return Err(e),
        }

        for outcome in OUTCOMES {
            let dir = approval_outcome_dir(outcome);
            for name in self.files.list_dir(cancel, &dir).await? {
                if name.starts_with('.') || id_from_file_name(&name).is_none() {
                    continue;
                }
                let file = dir.join(&name);
                match self.files.read_optional::<PendingApproval>(cancel, &file).await {
                    Ok(Some(approval)) => scanned.push(Scanned {
                        file,
                        record: Ok(approval),
                    }),
                    Ok(None) => {}
                    Err(StorageError::Decode { source, .. }) => scanned.push(Scanned {
                        file,
                        record: Err(source.to_string()),
                    }),
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(scanned)
    }

    async fn read_queue(&self, cancel: &CancellationToken) -> Result<Vec<PendingApproval>> {
        Ok(self
            .files
            .read_optional(cancel, &approval_queue_path())
            .await?
            .unwrap_or_default())
    }

    async fn find_resolved(
        &self,
        cancel: &CancellationToken,
        id: &str,
    ) -> Result<Option<PendingApproval>> {
        for outcome in OUTCOMES {
            let path = approval_outcome_path(outcome, id)?;
            if let Some(approval) = self.read_outcome(cancel, &path).await? {
                return Ok(Some(approval));
            }
        }
        Ok(None)
    }

    async fn read_outcome(
        &self,
        cancel: &CancellationToken,
        path: &Path,
    ) -> Result<Option<PendingApproval>> {
        Ok(self.files.read_optional(cancel, path).await?)
    }
}

#[async_trait]
impl EntityHandler for ApprovalQueue {
    type Record = PendingApproval;

    async fn add(&self, cancel: &CancellationToken, draft: ApprovalDraft) -> Result<PendingApproval> {
        self.create(cancel, draft).await
    }

    async fn list(
        &self,
        cancel: &CancellationToken,
        filter: &ListFilter,
    ) -> Result<Vec<PendingApproval>> {
        let all = ApprovalQueue::list(self, cancel, None).await?;
        Ok(filter.apply(all))
    }

    async fn get(&self, cancel: &CancellationToken, id: &str) -> Result<PendingApproval> {
        ApprovalQueue::get(self, cancel, id).await
    }

    /// Resolving is the only change an approval accepts
    async fn update(
        &self,
        cancel: &CancellationToken,
        id: &str,
        patch: ApprovalResolution,
    ) -> Result<PendingApproval> {
        self.resolve(cancel, id, patch).await
    }

    async fn delete(&self, _cancel: &CancellationToken, _id: &str) -> Result<()> {
        Err(CharterError::UnsupportedOperation {
            kind: EntityKind::Approval,
            operation: "delete",
        })
    }

    async fn scan(&self, cancel: &CancellationToken) -> Result<Vec<Scanned<PendingApproval>>> {
        self.scan_locked(cancel).await
    }
}
