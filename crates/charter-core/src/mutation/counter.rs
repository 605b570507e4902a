//! Sequential id counters
//!
//! One cached `kind -> last issued number` table per store, loaded lazily
//! from the snapshot file. Each increment is staged on a copy, persisted under
//! the snapshot lock, and only then committed to the cache, so a failed write
//! never leaves the cache ahead of disk. Counters only ever move up.

use super::lock::LockManager;
use crate::error::Result;
use crate::registry::Registry;
use charter_identity::{
    format_sequential, id_from_file_name, parse_sequential, EntityKind, ValidationError,
    COUNTER_SNAPSHOT, MAX_SEQUENTIAL,
};
use charter_storage::{checkpoint, CancellationToken, FileStore};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

type Snapshot = BTreeMap<String, u32>;

/// Per-store sequential id counters
#[derive(Debug)]
pub struct IdCounters {
    files: FileStore,
    locks: Arc<LockManager>,
    cache: Mutex<Option<Snapshot>>,
}

impl IdCounters {
    #[must_use]
    pub fn new(files: FileStore, locks: Arc<LockManager>) -> Self {
        Self {
            files,
            locks,
            cache: Mutex::new(None),
        }
    }

    /// Issue the next number for `kind`
    ///
    /// # Errors
    /// - [`ValidationError`] if `kind` is not sequential or its id space is used up
    /// - lock, cancellation or storage failures; the counter is unchanged
    pub async fn next(&self, cancel: &CancellationToken, kind: EntityKind) -> Result<u32> {
        ensure_sequential(kind)?;
        checkpoint(cancel)?;

        let mut cache = self.cache.lock().await;
        let counters = self.loaded(cancel, &mut cache).await?;

        let last = counters.get(kind.name()).copied().unwrap_or(0);
        let value = match last.checked_add(1) {
            Some(value) if value <= MAX_SEQUENTIAL => value,
            _ => {
                return Err(ValidationError::IdSpaceExhausted {
                    kind: kind.name().to_string(),
                    value: last.saturating_add(1),
                }
                .into())
            }
        };

        let mut staged = counters.clone();
        staged.insert(kind.name().to_string(), value);
        self.persist(cancel, &staged).await?;
        *counters = staged;

        tracing::debug!(kind = %kind, value, "issued sequential id");
        Ok(value)
    }

    /// Issue the next formatted id for `kind`, e.g. `obj-007`
    ///
    /// # Errors
    /// As [`IdCounters::next`].
    pub async fn next_id(&self, cancel: &CancellationToken, kind: EntityKind) -> Result<String> {
        let value = self.next(cancel, kind).await?;
        Ok(format_sequential(kind, value)?)
    }

    /// Last issued number for `kind` (0 when none)
    ///
    /// # Errors
    /// Cancellation or storage failures while loading the snapshot.
    pub async fn current(&self, cancel: &CancellationToken, kind: EntityKind) -> Result<u32> {
        checkpoint(cancel)?;
        let mut cache = self.cache.lock().await;
        let counters = self.loaded(cancel, &mut cache).await?;
        Ok(counters.get(kind.name()).copied().unwrap_or(0))
    }

    /// Raise the counter for `kind` to the highest number among `ids`
    ///
    /// Ids that are not sequential ids of `kind` are ignored. Never lowers
    /// the counter. Returns the resulting value.
    ///
    /// # Errors
    /// As [`IdCounters::next`].
    pub async fn initialize_from_existing<I, S>(
        &self,
        cancel: &CancellationToken,
        kind: EntityKind,
        ids: I,
    ) -> Result<u32>
    where
        I: IntoIterator<Item = S> + Send,
        S: AsRef<str>,
    {
        ensure_sequential(kind)?;
        let highest = ids
            .into_iter()
            .filter_map(|id| parse_sequential(kind, id.as_ref()))
            .max()
            .unwrap_or(0);

        checkpoint(cancel)?;
        let mut cache = self.cache.lock().await;
        let counters = self.loaded(cancel, &mut cache).await?;

        let current = counters.get(kind.name()).copied().unwrap_or(0);
        if highest <= current {
            return Ok(current);
        }

        let mut staged = counters.clone();
        staged.insert(kind.name().to_string(), highest);
        self.persist(cancel, &staged).await?;
        *counters = staged;

        tracing::info!(kind = %kind, from = current, to = highest, "raised id counter from existing records");
        Ok(highest)
    }

    /// Raise every sequential kind's counter from what is on disk
    ///
    /// Each registered sequential kind is scanned. Undecodable record files
    /// still count through their file name and are logged; kinds without a
    /// handler are left alone.
    ///
    /// # Errors
    /// As [`IdCounters::initialize_from_existing`], or failures listing files.
    pub async fn initialize_all(
        &self,
        cancel: &CancellationToken,
        registry: &Registry,
    ) -> Result<BTreeMap<EntityKind, u32>> {
        let mut result = BTreeMap::new();
        for kind in EntityKind::ALL.into_iter().filter(|k| k.is_sequential()) {
            let Some(handler) = registry.handler(kind) else {
                continue;
            };
            let mut ids = Vec::new();
            for entry in handler.scan_entities(cancel).await? {
                match entry.record {
                    Ok(entity) => ids.push(entity.id().to_string()),
                    Err(reason) => {
                        tracing::warn!(
                            kind = %kind,
                            file = %entry.file.display(),
                            %reason,
                            "unreadable record while seeding id counter"
                        );
                        let stem = entry
                            .file
                            .file_name()
                            .and_then(|n| n.to_str())
                            .and_then(id_from_file_name);
                        ids.extend(stem.map(str::to_string));
                    }
                }
            }
            let value = self.initialize_from_existing(cancel, kind, ids).await?;
            result.insert(kind, value);
        }
        Ok(result)
    }

    async fn loaded<'a>(
        &self,
        cancel: &CancellationToken,
        cache: &'a mut Option<Snapshot>,
    ) -> Result<&'a mut Snapshot> {
        if cache.is_none() {
            let snapshot: Snapshot = self
                .files
                .read_optional(cancel, Path::new(COUNTER_SNAPSHOT))
                .await?
                .unwrap_or_default();
            tracing::debug!(kinds = snapshot.len(), "loaded id counter snapshot");
            *cache = Some(snapshot);
        }
        Ok(cache.get_or_insert_with(Snapshot::new))
    }

    async fn persist(&self, cancel: &CancellationToken, staged: &Snapshot) -> Result<()> {
        let path = Path::new(COUNTER_SNAPSHOT);
        let _guard = self.locks.lock(cancel, path).await?;
        self.files.write(cancel, path, staged).await?;
        Ok(())
    }
}

fn ensure_sequential(kind: EntityKind) -> Result<(), ValidationError> {
    if kind.is_sequential() {
        Ok(())
    } else {
        Err(ValidationError::invalid(
            "kind",
            format!("{kind} does not use sequential ids"),
        ))
    }
}
