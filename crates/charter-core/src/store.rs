//! One opened project store
//!
//! [`Store`] wires the per-store services, one handler per kind and the
//! registry they check each other through. Integrity lookups go through a
//! weak registry binding, so handlers and registry never own each other.

use crate::config::{IntegrityMode, StoreConfig};
use crate::context::StoreContext;
use crate::error::Result;
use crate::handler::{MarkConsiderationDecided, StandardHandler};
use crate::integrity::{lint, Integrity, LintReport};
use crate::model::{
    ActionType, Actor, Consideration, Decision, Deliverable, Objective, Risk, Task, Vision,
};
use crate::mutation::{approval_level, ApprovalLevel, ApprovalQueue};
use crate::registry::{Registry, RegistryReferences};
use charter_identity::EntityKind;
use charter_storage::{CancellationToken, FileStore};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Typed handlers of a store
#[derive(Debug, Clone)]
pub struct Handlers {
    pub vision: Arc<StandardHandler<Vision>>,
    pub objectives: Arc<StandardHandler<Objective>>,
    pub deliverables: Arc<StandardHandler<Deliverable>>,
    pub risks: Arc<StandardHandler<Risk>>,
    pub considerations: Arc<StandardHandler<Consideration>>,
    pub decisions: Arc<StandardHandler<Decision>>,
    pub tasks: Arc<StandardHandler<Task>>,
    pub actors: Arc<StandardHandler<Actor>>,
    pub approvals: Arc<ApprovalQueue>,
}

impl Handlers {
    fn new(ctx: &StoreContext, integrity: &Integrity) -> Self {
        let considerations = Arc::new(StandardHandler::new(ctx, integrity.clone()));
        let decisions = StandardHandler::new(ctx, integrity.clone()).with_effect(Arc::new(
            MarkConsiderationDecided::new(Arc::clone(&considerations)),
        ));
        Self {
            vision: Arc::new(StandardHandler::new(ctx, integrity.clone())),
            objectives: Arc::new(StandardHandler::new(ctx, integrity.clone())),
            deliverables: Arc::new(StandardHandler::new(ctx, integrity.clone())),
            risks: Arc::new(StandardHandler::new(ctx, integrity.clone())),
            considerations,
            decisions: Arc::new(decisions),
            tasks: Arc::new(StandardHandler::new(ctx, integrity.clone())),
            actors: Arc::new(StandardHandler::new(ctx, integrity.clone())),
            approvals: Arc::new(ApprovalQueue::new(ctx)),
        }
    }

    fn registry(&self) -> Registry {
        let mut registry = Registry::new();
        registry.register(self.vision.clone());
        registry.register(self.objectives.clone());
        registry.register(self.deliverables.clone());
        registry.register(self.risks.clone());
        registry.register(self.considerations.clone());
        registry.register(self.decisions.clone());
        registry.register(self.tasks.clone());
        registry.register(self.actors.clone());
        registry.register(self.approvals.clone());
        registry
    }
}

/// An opened project store
#[derive(Debug)]
pub struct Store {
    ctx: StoreContext,
    config: StoreConfig,
    registry: Arc<Registry>,
    handlers: Handlers,
}

impl Store {
    /// Open the store at `root` with the configuration found there
    ///
    /// # Errors
    /// Malformed `charter.toml`, cancellation, or storage failures while
    /// bootstrapping id counters.
    pub async fn open(root: impl AsRef<Path>, cancel: &CancellationToken) -> Result<Self> {
        let files = FileStore::open(root).await?;
        let config = StoreConfig::load(&files, cancel).await?;
        Self::with_files(files, config, cancel).await
    }

    /// Open the store at `root` with explicit configuration
    ///
    /// # Errors
    /// As [`Store::open`].
    pub async fn open_with_config(
        root: impl AsRef<Path>,
        config: StoreConfig,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let files = FileStore::open(root).await?;
        Self::with_files(files, config, cancel).await
    }

    async fn with_files(
        files: FileStore,
        config: StoreConfig,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let ctx = StoreContext::new(files, config.lock_timeout());
        let references = Arc::new(RegistryReferences::new());
        let integrity = match config.integrity {
            IntegrityMode::Enforced => Integrity::shared(Arc::clone(&references)),
            IntegrityMode::Disabled => Integrity::disabled(),
        };
        let handlers = Handlers::new(&ctx, &integrity);
        let registry = Arc::new(handlers.registry());
        references.bind(&registry);

        let store = Self {
            ctx,
            config,
            registry,
            handlers,
        };
        let counters = store.bootstrap_counters(cancel).await?;
        tracing::info!(
            root = %store.root().display(),
            mode = %store.config.approval_mode,
            integrity = ?store.config.integrity,
            counters = ?counters,
            "opened store"
        );
        Ok(store)
    }

    /// Raise sequential id counters past every id already on disk
    ///
    /// Runs on open; safe to repeat since counters only move up. Records that
    /// fail to decode are counted by file name and left for [`Store::lint`].
    ///
    /// # Errors
    /// Cancellation or storage failures.
    pub async fn bootstrap_counters(
        &self,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<EntityKind, u32>> {
        self.ctx
            .counters
            .initialize_all(cancel, &self.registry)
            .await
    }

    /// Canonical store root
    #[must_use]
    pub fn root(&self) -> &Path {
        self.ctx.files.root()
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Shared services
    #[must_use]
    pub fn context(&self) -> &StoreContext {
        &self.ctx
    }

    /// Registry of every kind, keyed by type name
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    #[must_use]
    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    #[must_use]
    pub fn vision(&self) -> &StandardHandler<Vision> {
        &self.handlers.vision
    }

    #[must_use]
    pub fn objectives(&self) -> &StandardHandler<Objective> {
        &self.handlers.objectives
    }

    #[must_use]
    pub fn deliverables(&self) -> &StandardHandler<Deliverable> {
        &self.handlers.deliverables
    }

    #[must_use]
    pub fn risks(&self) -> &StandardHandler<Risk> {
        &self.handlers.risks
    }

    #[must_use]
    pub fn considerations(&self) -> &StandardHandler<Consideration> {
        &self.handlers.considerations
    }

    #[must_use]
    pub fn decisions(&self) -> &StandardHandler<Decision> {
        &self.handlers.decisions
    }

    #[must_use]
    pub fn tasks(&self) -> &StandardHandler<Task> {
        &self.handlers.tasks
    }

    #[must_use]
    pub fn actors(&self) -> &StandardHandler<Actor> {
        &self.handlers.actors
    }

    #[must_use]
    pub fn approvals(&self) -> &ApprovalQueue {
        &self.handlers.approvals
    }

    /// Oversight level for `action` under the configured mode
    #[must_use]
    pub fn approval_level(&self, action: ActionType) -> ApprovalLevel {
        approval_level(action, self.config.approval_mode)
    }

    /// Read-only consistency scan of every kind
    ///
    /// # Errors
    /// Cancellation or storage failures while listing files.
    pub async fn lint(&self, cancel: &CancellationToken) -> Result<LintReport> {
        lint::lint(&self.registry, cancel).await
    }

    /// Apply the auto-fixable findings of `report`
    ///
    /// # Errors
    /// The first failing update.
    pub async fn apply_lint_fixes(
        &self,
        cancel: &CancellationToken,
        report: &LintReport,
    ) -> Result<usize> {
        lint::apply_fixes(&self.registry, cancel, report).await
    }
}
