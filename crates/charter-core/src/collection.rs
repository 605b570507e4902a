//! Record files per kind
//!
//! [`Collection`] maps a record kind onto its layout: one fixed file
//! (singleton), one file per record in a directory, or one shared array file.
//! Array files are rewritten in full on every change, under the resource lock
//! for that file, so concurrent inserts cannot drop each other.

use crate::error::{CharterError, Result};
use crate::model::Record;
use crate::mutation::LockManager;
use charter_identity::{entity_relative_path, file_name, id_from_file_name, Layout};
use charter_storage::{CancellationToken, FileStore, StorageError};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One record as found on disk, or why it could not be decoded
#[derive(Debug, Clone)]
pub struct Scanned<R> {
    /// File the record came from, relative to the store root
    pub file: PathBuf,
    pub record: std::result::Result<R, String>,
}

impl<R> Scanned<R> {
    /// Convert the record, keeping file and failure
    pub fn map<T>(self, f: impl FnOnce(R) -> T) -> Scanned<T> {
        Scanned {
            file: self.file,
            record: self.record.map(f),
        }
    }
}

/// Typed access to the files of one kind
#[derive(Debug)]
pub(crate) struct Collection<R> {
    files: FileStore,
    locks: Arc<LockManager>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Collection<R> {
    pub(crate) fn new(files: FileStore, locks: Arc<LockManager>) -> Self {
        Self {
            files,
            locks,
            _record: PhantomData,
        }
    }

    /// Record `id`, if stored
    pub(crate) async fn load(&self, cancel: &CancellationToken, id: &str) -> Result<Option<R>> {
        match R::KIND.layout() {
            Layout::Singleton(_) | Layout::Directory(_) => {
                let path = entity_relative_path(R::KIND, id)?;
                Ok(self.files.read_optional(cancel, &path).await?)
            }
            Layout::Array(name) => {
                entity_relative_path(R::KIND, id)?;
                let all = self.read_array(cancel, &file_name(name)).await?;
                Ok(all.into_iter().find(|r| r.id() == id))
            }
            Layout::Queue => Err(unsupported::<R>()),
        }
    }

    /// Whether record `id` is stored
    pub(crate) async fn contains(&self, cancel: &CancellationToken, id: &str) -> Result<bool> {
        match R::KIND.layout() {
            Layout::Singleton(_) | Layout::Directory(_) => {
                let path = entity_relative_path(R::KIND, id)?;
                Ok(self.files.exists(cancel, &path).await?)
            }
            _ => Ok(self.load(cancel, id).await?.is_some()),
        }
    }

    /// Every stored record, in storage order
    pub(crate) async fn load_all(&self, cancel: &CancellationToken) -> Result<Vec<R>> {
        match R::KIND.layout() {
            Layout::Singleton(name) => Ok(self
                .files
                .read_optional(cancel, &file_name(name))
                .await?
                .into_iter()
                .collect()),
            Layout::Directory(dir) => {
                let mut records = Vec::new();
                for file in self.record_files(cancel, dir).await? {
                    // a file removed between listing and reading is skipped
                    if let Some(record) = self.files.read_optional(cancel, &file).await? {
                        records.push(record);
                    }
                }
                Ok(records)
            }
            Layout::Array(name) => self.read_array(cancel, &file_name(name)).await,
            Layout::Queue => Err(unsupported::<R>()),
        }
    }

    /// Every stored record with its file, keeping decode failures
    pub(crate) async fn scan(&self, cancel: &CancellationToken) -> Result<Vec<Scanned<R>>> {
        let files = match R::KIND.layout() {
            Layout::Singleton(name) | Layout::Array(name) => vec![file_name(name)],
            Layout::Directory(dir) => self.record_files(cancel, dir).await?,
            Layout::Queue => return Err(unsupported::<R>()),
        };
        let is_array = matches!(R::KIND.layout(), Layout::Array(_));

        let mut scanned = Vec::new();
        for file in files {
            if is_array {
                match self.files.read_optional::<Vec<R>>(cancel, &file).await {
                    Ok(records) => scanned.extend(records.unwrap_or_default().into_iter().map(
                        |record| Scanned {
                            file: file.clone(),
                            record: Ok(record),
                        },
                    )),
                    Err(StorageError::Decode { source, .. }) => scanned.push(Scanned {
                        file,
                        record: Err(source.to_string()),
                    }),
                    Err(e) => return Err(e.into()),
                }
            } else {
                match self.files.read_optional::<R>(cancel, &file).await {
                    Ok(Some(record)) => scanned.push(Scanned {
                        file,
                        record: Ok(record),
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

    /// Store a new record
    ///
    /// # Errors
    /// [`CharterError::AlreadyExists`] if the id is taken.
    pub(crate) async fn insert(&self, cancel: &CancellationToken, record: &R) -> Result<()> {
        match R::KIND.layout() {
            Layout::Singleton(_) | Layout::Directory(_) => {
                let path = entity_relative_path(R::KIND, record.id())?;
                if self.files.exists(cancel, &path).await? {
                    return Err(already_exists(record));
                }
                Ok(self.files.write(cancel, &path, record).await?)
            }
            Layout::Array(name) => {
                let path = file_name(name);
                let _guard = self.locks.lock(cancel, &path).await?;
                let mut all = self.read_array(cancel, &path).await?;
                if all.iter().any(|r| r.id() == record.id()) {
                    return Err(already_exists(record));
                }
                all.push(record.clone());
                Ok(self.files.write(cancel, &path, &all).await?)
            }
            Layout::Queue => Err(unsupported::<R>()),
        }
    }

    /// Overwrite an existing record
    ///
    /// # Errors
    /// [`CharterError::NotFound`] if the record is gone.
    pub(crate) async fn replace(&self, cancel: &CancellationToken, record: &R) -> Result<()> {
        match R::KIND.layout() {
            Layout::Singleton(_) | Layout::Directory(_) => {
                let path = entity_relative_path(R::KIND, record.id())?;
                if !self.files.exists(cancel, &path).await? {
                    return Err(CharterError::not_found(R::KIND, record.id()));
                }
                Ok(self.files.write(cancel, &path, record).await?)
            }
            Layout::Array(name) => {
                let path = file_name(name);
                let _guard = self.locks.lock(cancel, &path).await?;
                let mut all = self.read_array(cancel, &path).await?;
                let slot = all
                    .iter_mut()
                    .find(|r| r.id() == record.id())
                    .ok_or_else(|| CharterError::not_found(R::KIND, record.id()))?;
                *slot = record.clone();
                Ok(self.files.write(cancel, &path, &all).await?)
            }
            Layout::Queue => Err(unsupported::<R>()),
        }
    }

    /// Remove record `id`; `false` if it was not stored
    pub(crate) async fn remove(&self, cancel: &CancellationToken, id: &str) -> Result<bool> {
        match R::KIND.layout() {
            Layout::Singleton(_) | Layout::Directory(_) => {
                let path = entity_relative_path(R::KIND, id)?;
                Ok(self.files.delete(cancel, &path).await?)
            }
            Layout::Array(name) => {
                entity_relative_path(R::KIND, id)?;
                let path = file_name(name);
                let _guard = self.locks.lock(cancel, &path).await?;
                let mut all = self.read_array(cancel, &path).await?;
                let before = all.len();
                all.retain(|r| r.id() != id);
                if all.len() == before {
                    return Ok(false);
                }
                self.files.write(cancel, &path, &all).await?;
                Ok(true)
            }
            Layout::Queue => Err(unsupported::<R>()),
        }
    }

    async fn read_array(&self, cancel: &CancellationToken, path: &Path) -> Result<Vec<R>> {
        Ok(self
            .files
            .read_optional::<Vec<R>>(cancel, path)
            .await?
            .unwrap_or_default())
    }

    async fn record_files(&self, cancel: &CancellationToken, dir: &str) -> Result<Vec<PathBuf>> {
        let dir = Path::new(dir);
        Ok(self
            .files
            .list_dir(cancel, dir)
            .await?
            .into_iter()
            .filter(|name| !name.starts_with('.') && id_from_file_name(name).is_some())
            .map(|name| dir.join(name))
            .collect())
    }
}

fn already_exists<R: Record>(record: &R) -> CharterError {
    CharterError::AlreadyExists {
        kind: R::KIND,
        id: record.id().to_string(),
    }
}

fn unsupported<R: Record>() -> CharterError {
    CharterError::UnsupportedOperation {
        kind: R::KIND,
        operation: "file collection access",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Actor, ActorDraft, Objective, ObjectiveDraft};
    use crate::mutation::DEFAULT_LOCK_TIMEOUT;
    use chrono::Utc;

    async fn setup<R: Record>() -> (tempfile::TempDir, Collection<R>) {
        let dir = tempfile::tempdir().unwrap();
        let files = FileStore::open(dir.path()).await.unwrap();
        let locks = Arc::new(LockManager::new(files.clone(), DEFAULT_LOCK_TIMEOUT));
        (dir, Collection::new(files, locks))
    }

    fn actor(id: &str, name: &str) -> Actor {
        let mut actor = Actor::from_draft(
            ActorDraft {
                name: name.into(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        actor.set_id(id.into());
        actor
    }

    #[tokio::test]
    async fn array_layout_shares_one_file() {
        let (dir, actors) = setup::<Actor>().await;
        let cancel = CancellationToken::new();
        actors.insert(&cancel, &actor("actor-00000001", "Ada")).await.unwrap();
        actors.insert(&cancel, &actor("actor-00000002", "Grace")).await.unwrap();

        assert!(dir.path().join("actors.yaml").is_file());
        let all = actors.load_all(&cancel).await.unwrap();
        assert_eq!(all.len(), 2);

        let err = actors
            .insert(&cancel, &actor("actor-00000001", "Ada again"))
            .await
            .unwrap_err();
        assert!(matches!(err, CharterError::AlreadyExists { .. }));

        assert!(actors.remove(&cancel, "actor-00000001").await.unwrap());
        assert!(!actors.remove(&cancel, "actor-00000001").await.unwrap());
        assert!(!actors.contains(&cancel, "actor-00000001").await.unwrap());
        assert!(actors.contains(&cancel, "actor-00000002").await.unwrap());
    }

    #[tokio::test]
    async fn directory_scan_reports_undecodable_files() {
        let (dir, objectives) = setup::<Objective>().await;
        let cancel = CancellationToken::new();
        let mut objective = Objective::from_draft(
            ObjectiveDraft {
                title: "Ship".into(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        objective.set_id("obj-001".into());
        objectives.insert(&cancel, &objective).await.unwrap();
        std::fs::write(dir.path().join("objectives/obj-002.yaml"), "title: [").unwrap();
        std::fs::write(dir.path().join("objectives/notes.txt"), "ignored").unwrap();

        let scanned = objectives.scan(&cancel).await.unwrap();
        assert_eq!(scanned.len(), 2);
        assert!(scanned[0].record.is_ok());
        assert!(scanned[1].record.is_err());
        assert_eq!(scanned[1].file, PathBuf::from("objectives/obj-002.yaml"));
    }

    #[tokio::test]
    async fn replace_requires_existing_record() {
        let (_dir, actors) = setup::<Actor>().await;
        let err = actors
            .replace(&CancellationToken::new(), &actor("actor-00000009", "Nobody"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
