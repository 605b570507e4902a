//! Integration tests for the file store boundary

use charter_storage::{CancellationToken, FileStore, StorageError};
use std::path::Path;

#[tokio::test]
async fn nul_and_control_bytes_never_reach_the_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).await.unwrap();
    let cancel = CancellationToken::new();

    for bad in ["risks/a\0.yaml", "risks/a\u{7}.yaml", "risks/\r.yaml"] {
        let err = store
            .write(&cancel, Path::new(bad), &"payload")
            .await
            .unwrap_err();
        assert!(
            matches!(err, StorageError::Security(_)),
            "{bad:?} gave {err:?}"
        );
    }
    assert!(!dir.path().join("risks").exists());
}

#[tokio::test]
async fn root_is_canonical() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path().join("project")).await.unwrap();
    assert!(store.root().is_absolute());
    assert_eq!(
        store.root(),
        std::fs::canonicalize(dir.path().join("project")).unwrap()
    );
}

#[tokio::test]
async fn decode_failure_is_reported_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).await.unwrap();
    let cancel = CancellationToken::new();
    std::fs::write(dir.path().join("broken.yaml"), "count: [unterminated").unwrap();

    let err = store
        .read::<Vec<u32>>(&cancel, Path::new("broken.yaml"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Decode { .. }));
    assert!(err.to_string().contains("broken.yaml"));
}

#[tokio::test]
async fn cancelled_reads_fail_before_io() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).await.unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    assert!(matches!(
        store.exists(&cancel, Path::new("x.yaml")).await,
        Err(StorageError::Cancelled)
    ));
    assert!(matches!(
        store.list_dir(&cancel, Path::new("")).await,
        Err(StorageError::Cancelled)
    ));
    assert!(matches!(
        store.delete(&cancel, Path::new("x.yaml")).await,
        Err(StorageError::Cancelled)
    ));
}
