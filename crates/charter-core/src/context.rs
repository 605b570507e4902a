//! Shared per-store services handed to every handler

use crate::mutation::{IdCounters, LockManager};
use charter_storage::FileStore;
use std::sync::Arc;
use std::time::Duration;

/// Storage, locks and counters of one store
///
/// Built once per project root; handlers hold clones of the pieces they use.
#[derive(Debug, Clone)]
pub struct StoreContext {
    pub files: FileStore,
    pub locks: Arc<LockManager>,
    pub counters: Arc<IdCounters>,
}

impl StoreContext {
    /// Services over `files` with `lock_timeout` as the default lock wait
    #[must_use]
    pub fn new(files: FileStore, lock_timeout: Duration) -> Self {
        let locks = Arc::new(LockManager::new(files.clone(), lock_timeout));
        let counters = Arc::new(IdCounters::new(files.clone(), Arc::clone(&locks)));
        Self {
            files,
            locks,
            counters,
        }
    }
}
