//! Resource locks with a bounded wait
//!
//! A lock covers one logical resource (a shared file such as the approval
//! queue). It is taken in two layers: an in-process async mutex per resource,
//! so tasks of one store queue behind each other, and an advisory OS lock on
//! `<resource>.lock` for cooperating processes. [`ResourceGuard`] releases
//! both when dropped, on every exit path.

use crate::error::{CharterError, Result};
use charter_storage::{checkpoint, CancellationToken, FileStore, StorageError};
use dashmap::DashMap;
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

/// Default wait before giving up on a busy resource
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Lock table for one store
#[derive(Debug)]
pub struct LockManager {
    files: FileStore,
    timeout: Duration,
    local: DashMap<PathBuf, Arc<Mutex<()>>>,
}

/// Held lock on a resource; dropping it releases the resource
#[derive(Debug)]
pub struct ResourceGuard {
    resource: PathBuf,
    file: File,
    _local: OwnedMutexGuard<()>,
}

impl ResourceGuard {
    /// Resource path relative to the store root
    #[must_use]
    pub fn resource(&self) -> &Path {
        &self.resource
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        if let Err(e) = fs2::FileExt::unlock(&self.file) {
            tracing::debug!(resource = %self.resource.display(), error = %e, "advisory unlock failed");
        }
        tracing::trace!(resource = %self.resource.display(), "released resource lock");
    }
}

impl LockManager {
    /// Lock table over `files` with the default wait applied to
    /// [`LockManager::lock`]
    #[must_use]
    pub fn new(files: FileStore, timeout: Duration) -> Self {
        Self {
            files,
            timeout,
            local: DashMap::new(),
        }
    }

    /// Configured default wait
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Lock `resource` waiting at most the configured timeout
    ///
    /// # Errors
    /// As [`LockManager::lock_with_timeout`].
    pub async fn lock(&self, cancel: &CancellationToken, resource: &Path) -> Result<ResourceGuard> {
        self.lock_with_timeout(cancel, resource, self.timeout).await
    }

    /// Lock `resource`, waiting at most `timeout`
    ///
    /// # Errors
    /// - [`CharterError::LockTimeout`] if the resource stays busy
    /// - [`CharterError::Cancelled`] if `cancel` fires first
    /// - security or I/O failures on the lock file
    pub async fn lock_with_timeout(
        &self,
        cancel: &CancellationToken,
        resource: &Path,
        timeout: Duration,
    ) -> Result<ResourceGuard> {
        checkpoint(cancel)?;
        let lock_rel = lock_file_for(resource);
        let lock_path = self.files.resolve(&lock_rel)?;

        let started = Instant::now();
        let deadline = started + timeout;

        let mutex = self.local.entry(lock_path.clone()).or_default().clone();
        let local = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CharterError::Cancelled),
            acquired = tokio::time::timeout_at(deadline, mutex.lock_owned()) => match acquired {
                Ok(guard) => guard,
                Err(_) => return Err(busy(resource, started)),
            },
        };

        if let Some(parent) = lock_rel.parent() {
            self.files.ensure_dir(cancel, parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .await
            .map_err(|e| StorageError::io(lock_rel.as_path(), e))?
            .into_std()
            .await;

        loop {
            match fs2::FileExt::try_lock_exclusive(&file) {
                Ok(()) => break,
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    if Instant::now() >= deadline {
                        return Err(busy(resource, started));
                    }
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(CharterError::Cancelled),
                        () = tokio::time::sleep(POLL_INTERVAL) => {}
                    }
                }
                Err(e) => return Err(StorageError::io(lock_rel.as_path(), e).into()),
            }
        }

        tracing::trace!(
            resource = %resource.display(),
            waited_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "acquired resource lock"
        );
        Ok(ResourceGuard {
            resource: resource.to_path_buf(),
            file,
            _local: local,
        })
    }
}

fn lock_file_for(resource: &Path) -> PathBuf {
    let mut name = OsString::from(resource.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

fn busy(resource: &Path, started: Instant) -> CharterError {
    let waited = started.elapsed();
    tracing::warn!(
        resource = %resource.display(),
        waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
        "resource lock timed out"
    );
    CharterError::LockTimeout {
        resource: resource.display().to_string(),
        waited,
    }
}
