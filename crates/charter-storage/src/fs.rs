//! File-backed typed storage
//!
//! [`FileStore`] is the only component that touches the filesystem for
//! record data. All paths it accepts are relative to the store root and are
//! re-checked with [`resolve_path`] on every call.

use crate::cancel::{checkpoint, CancellationToken};
use crate::error::StorageError;
use charter_identity::resolve_path;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Typed YAML storage rooted at one project directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) the store rooted at `root`
    ///
    /// The root is canonicalized so containment checks compare like with like.
    ///
    /// # Errors
    /// [`StorageError::Io`] if the directory cannot be created or resolved.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref();
        fs::create_dir_all(root)
            .await
            .map_err(|e| StorageError::io(root, e))?;
        let root = fs::canonicalize(root)
            .await
            .map_err(|e| StorageError::io(root, e))?;
        tracing::debug!(root = %root.display(), "opened file store");
        Ok(Self { root })
    }

    /// Canonical store root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path inside the root
    ///
    /// Violations are logged as security events.
    ///
    /// # Errors
    /// [`StorageError::Security`].
    pub fn resolve(&self, relative: &Path) -> Result<PathBuf, StorageError> {
        resolve_path(&self.root, relative).map_err(|err| {
            tracing::warn!(
                target: "charter::security",
                root = %self.root.display(),
                error = %err,
                "rejected store path"
            );
            StorageError::Security(err)
        })
    }

    /// Check whether `relative` exists
    ///
    /// # Errors
    /// Cancellation, security or I/O failures.
    pub async fn exists(
        &self,
        cancel: &CancellationToken,
        relative: &Path,
    ) -> Result<bool, StorageError> {
        checkpoint(cancel)?;
        let path = self.resolve(relative)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::io(relative, e))
    }

    /// Read and decode `relative`
    ///
    /// # Errors
    /// [`StorageError::NotFound`] if the file is missing, otherwise
    /// cancellation, security, I/O or decode failures.
    pub async fn read<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        relative: &Path,
    ) -> Result<T, StorageError> {
        self.read_optional(cancel, relative)
            .await?
            .ok_or_else(|| StorageError::NotFound(relative.to_path_buf()))
    }

    /// Read and decode `relative`, mapping a missing file to `None`
    ///
    /// # Errors
    /// Cancellation, security, I/O or decode failures.
    pub async fn read_optional<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        relative: &Path,
    ) -> Result<Option<T>, StorageError> {
        checkpoint(cancel)?;
        let path = self.resolve(relative)?;
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(relative, e)),
        };
        tracing::trace!(path = %relative.display(), bytes = text.len(), "read record file");
        serde_yaml::from_str(&text)
            .map(Some)
            .map_err(|source| StorageError::Decode {
                path: relative.to_path_buf(),
                source,
            })
    }

    /// Encode `value` and replace `relative` with it
    ///
    /// The new content is written to a sibling temp file and renamed into
    /// place, so readers see either the old or the new file. Cancellation is
    /// checked between every step; once observed nothing further is
    /// committed and the temp file is removed.
    ///
    /// # Errors
    /// Cancellation, security, encode or I/O failures.
    pub async fn write<T: Serialize + ?Sized>(
        &self,
        cancel: &CancellationToken,
        relative: &Path,
        value: &T,
    ) -> Result<(), StorageError> {
        checkpoint(cancel)?;
        let path = self.resolve(relative)?;
        let text = serde_yaml::to_string(value).map_err(|source| StorageError::Encode {
            path: relative.to_path_buf(),
            source,
        })?;

        if let Some(parent) = relative.parent() {
            self.ensure_dir(cancel, parent).await?;
        }

        checkpoint(cancel)?;
        let tmp = temp_sibling(&path);
        fs::write(&tmp, text.as_bytes())
            .await
            .map_err(|e| StorageError::io(relative, e))?;

        if let Err(err) = checkpoint(cancel) {
            discard(&tmp).await;
            return Err(err);
        }

        if let Err(e) = fs::rename(&tmp, &path).await {
            discard(&tmp).await;
            return Err(StorageError::io(relative, e));
        }

        tracing::trace!(path = %relative.display(), bytes = text.len(), "wrote record file");
        Ok(())
    }

    /// List file names directly under `relative`, sorted
    ///
    /// A missing directory lists as empty.
    ///
    /// # Errors
    /// Cancellation, security or I/O failures.
    pub async fn list_dir(
        &self,
        cancel: &CancellationToken,
        relative: &Path,
    ) -> Result<Vec<String>, StorageError> {
        checkpoint(cancel)?;
        let path = self.resolve(relative)?;
        let mut entries = match fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(relative, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(relative, e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map_err(|e| StorageError::io(relative, e))?
                .is_file();
            if is_file {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove the file at `relative`
    ///
    /// Returns `false` if it did not exist.
    ///
    /// # Errors
    /// Cancellation, security or I/O failures.
    pub async fn delete(
        &self,
        cancel: &CancellationToken,
        relative: &Path,
    ) -> Result<bool, StorageError> {
        checkpoint(cancel)?;
        let path = self.resolve(relative)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::trace!(path = %relative.display(), "deleted record file");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(relative, e)),
        }
    }

    /// Create `relative` and any missing parents
    ///
    /// # Errors
    /// Cancellation, security or I/O failures.
    pub async fn ensure_dir(
        &self,
        cancel: &CancellationToken,
        relative: &Path,
    ) -> Result<(), StorageError> {
        checkpoint(cancel)?;
        let path = self.resolve(relative)?;
        fs::create_dir_all(&path)
            .await
            .map_err(|e| StorageError::io(relative, e))
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()))
}

async fn discard(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp).await {
        tracing::debug!(path = %tmp.display(), error = %e, "failed to remove temp file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    async fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn write_then_read() {
        let (_dir, store) = store().await;
        let cancel = CancellationToken::new();
        let value = Sample {
            name: "alpha".into(),
            count: 3,
        };

        store
            .write(&cancel, Path::new("nested/dir/sample.yaml"), &value)
            .await
            .unwrap();
        let back: Sample = store
            .read(&cancel, Path::new("nested/dir/sample.yaml"))
            .await
            .unwrap();
        assert_eq!(back, value);
        assert!(store
            .exists(&cancel, Path::new("nested/dir/sample.yaml"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn read_missing_is_not_found() {
        let (_dir, store) = store().await;
        let cancel = CancellationToken::new();
        let err = store
            .read::<Sample>(&cancel, Path::new("missing.yaml"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(store
            .read_optional::<Sample>(&cancel, Path::new("missing.yaml"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn traversal_is_a_security_error() {
        let (_dir, store) = store().await;
        let cancel = CancellationToken::new();
        let err = store
            .read::<Sample>(&cancel, Path::new("../outside.yaml"))
            .await
            .unwrap_err();
        assert!(err.is_security());

        let err = store
            .write(&cancel, Path::new("/tmp/abs.yaml"), &1u32)
            .await
            .unwrap_err();
        assert!(err.is_security());
    }

    #[tokio::test]
    async fn cancelled_write_leaves_nothing_behind() {
        let (dir, store) = store().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = store
            .write(&cancel, Path::new("a/b.yaml"), &1u32)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Cancelled));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn list_dir_sorted_and_missing_empty() {
        let (_dir, store) = store().await;
        let cancel = CancellationToken::new();
        assert!(store
            .list_dir(&cancel, Path::new("nothing"))
            .await
            .unwrap()
            .is_empty());

        for name in ["b.yaml", "a.yaml", "c.yaml"] {
            store
                .write(&cancel, &Path::new("items").join(name), &name)
                .await
                .unwrap();
        }
        let names = store.list_dir(&cancel, Path::new("items")).await.unwrap();
        assert_eq!(names, vec!["a.yaml", "b.yaml", "c.yaml"]);
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let (_dir, store) = store().await;
        let cancel = CancellationToken::new();
        store
            .write(&cancel, Path::new("x.yaml"), &1u32)
            .await
            .unwrap();
        assert!(store.delete(&cancel, Path::new("x.yaml")).await.unwrap());
        assert!(!store.delete(&cancel, Path::new("x.yaml")).await.unwrap());
    }

    #[tokio::test]
    async fn overwrite_replaces_content() {
        let (_dir, store) = store().await;
        let cancel = CancellationToken::new();
        store
            .write(&cancel, Path::new("n.yaml"), &vec![1u32, 2])
            .await
            .unwrap();
        store
            .write(&cancel, Path::new("n.yaml"), &vec![3u32])
            .await
            .unwrap();
        let back: Vec<u32> = store.read(&cancel, Path::new("n.yaml")).await.unwrap();
        assert_eq!(back, vec![3]);
    }
}
