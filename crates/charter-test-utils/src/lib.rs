//! Testing utilities for the Charter workspace
//!
//! Temp-dir store fixtures, minimal drafts and directory snapshots.

#![allow(missing_docs)]

use charter_core::config::StoreConfig;
use charter_core::model::{
    ActorDraft, ConsiderationDraft, DecisionDraft, DeliverableDraft, ObjectiveDraft, RiskDraft,
    TaskDraft, VisionDraft,
};
use charter_core::Store;
use charter_storage::CancellationToken;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A store in a fresh temp directory, removed on drop
pub struct TestStore {
    pub dir: TempDir,
    pub store: Store,
    pub cancel: CancellationToken,
}

impl TestStore {
    pub async fn new() -> Self {
        Self::with_config(StoreConfig::new()).await
    }

    pub async fn with_config(config: StoreConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let store = Store::open_with_config(dir.path(), config, &cancel)
            .await
            .unwrap();
        Self { dir, store, cancel }
    }

    /// Open a second store over the same directory
    pub async fn reopen(&self) -> Store {
        Store::open(self.dir.path(), &self.cancel).await.unwrap()
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn snapshot(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        snapshot_dir(self.dir.path())
    }
}

/// An already-cancelled token
pub fn cancelled() -> CancellationToken {
    let token = CancellationToken::new();
    token.cancel();
    token
}

/// Every file under `root` with its bytes, keyed by relative path
pub fn snapshot_dir(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let bytes = std::fs::read(&path).unwrap();
                out.insert(path.strip_prefix(root).unwrap().to_path_buf(), bytes);
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

pub fn vision_draft(statement: &str) -> VisionDraft {
    VisionDraft {
        statement: statement.into(),
        ..VisionDraft::default()
    }
}

pub fn objective_draft(title: &str) -> ObjectiveDraft {
    ObjectiveDraft {
        title: title.into(),
        ..ObjectiveDraft::default()
    }
}

pub fn deliverable_draft(objective_id: &str, title: &str) -> DeliverableDraft {
    DeliverableDraft {
        objective_id: objective_id.into(),
        title: title.into(),
        ..DeliverableDraft::default()
    }
}

pub fn risk_draft(title: &str) -> RiskDraft {
    RiskDraft::titled(title)
}

pub fn consideration_draft(title: &str) -> ConsiderationDraft {
    ConsiderationDraft {
        title: title.into(),
        options: vec!["option a".into(), "option b".into()],
        ..ConsiderationDraft::default()
    }
}

pub fn decision_draft(consideration_id: Option<&str>, title: &str) -> DecisionDraft {
    DecisionDraft {
        title: title.into(),
        rationale: "cheapest path that meets the deadline".into(),
        consideration_id: consideration_id.map(Into::into),
        ..DecisionDraft::default()
    }
}

pub fn task_draft(title: &str) -> TaskDraft {
    TaskDraft {
        title: title.into(),
        ..TaskDraft::default()
    }
}

pub fn actor_draft(name: &str) -> ActorDraft {
    ActorDraft {
        name: name.into(),
        ..ActorDraft::default()
    }
}
