//! Serialized mutation of shared files under concurrent callers

use charter_core::model::{ActionType, ApprovalDraft, ApprovalStatus, PendingApproval};
use charter_core::{CharterError, EntityHandler, StoreConfig};
use charter_identity::{
    approval_outcome_path, approval_queue_path, EntityKind, Resolution, COUNTER_SNAPSHOT,
};
use charter_test_utils::{objective_draft, TestStore};
use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_counter_calls_issue_a_dense_range() {
    let t = TestStore::new().await;
    let counters = Arc::clone(&t.store.context().counters);
    const N: u32 = 40;

    let calls = (0..N).map(|_| {
        let counters = Arc::clone(&counters);
        let cancel = t.cancel.clone();
        tokio::spawn(async move { counters.next(&cancel, EntityKind::Objective).await })
    });
    let issued: BTreeSet<u32> = join_all(calls)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(issued, (1..=N).collect::<BTreeSet<_>>());
    assert_eq!(counters.current(&t.cancel, EntityKind::Objective).await.unwrap(), N);
}

#[tokio::test]
async fn failed_persist_keeps_the_previous_value() {
    let t = TestStore::new().await;
    let counters = &t.store.context().counters;
    for expected in 1..=3 {
        assert_eq!(counters.next(&t.cancel, EntityKind::Objective).await.unwrap(), expected);
    }

    let snapshot = t.path().join(COUNTER_SNAPSHOT);
    std::fs::remove_file(&snapshot).unwrap();
    std::fs::create_dir(&snapshot).unwrap();

    let err = counters.next(&t.cancel, EntityKind::Objective).await.unwrap_err();
    assert!(matches!(err, CharterError::Storage(_)), "{err:?}");
    assert_eq!(counters.current(&t.cancel, EntityKind::Objective).await.unwrap(), 3);

    std::fs::remove_dir(&snapshot).unwrap();
    assert_eq!(counters.next(&t.cancel, EntityKind::Objective).await.unwrap(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_get_distinct_sequential_ids() {
    let t = TestStore::new().await;
    let store = Arc::new(t.store);
    let cancel = t.cancel.clone();

    let creates = (0..10).map(|i| {
        let store = Arc::clone(&store);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            store
                .objectives()
                .add(&cancel, objective_draft(&format!("Objective {i}")))
                .await
        })
    });
    let ids: BTreeSet<String> = join_all(creates)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().id)
        .collect();
    let expected: BTreeSet<String> = (1..=10).map(|n| format!("obj-{n:03}")).collect();
    assert_eq!(ids, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_approvals_resolve_exactly_once() {
    let t = TestStore::new().await;
    let request = t
        .store
        .approvals()
        .create(
            &t.cancel,
            ApprovalDraft::new(ActionType::DeleteEntity, "drop stale objective", "agent")
                .targeting(EntityKind::Objective, "obj-001"),
        )
        .await
        .unwrap();
    let store = Arc::new(t.store);

    let racers = ["alice", "bob"].map(|who| {
        let store = Arc::clone(&store);
        let cancel = t.cancel.clone();
        let id = request.id.clone();
        tokio::spawn(async move { store.approvals().approve(&cancel, &id, who).await })
    });
    let outcomes: Vec<_> = join_all(racers)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let approved: Vec<_> = outcomes.iter().filter_map(|o| o.as_ref().ok()).collect();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].status, ApprovalStatus::Approved);

    let refused: Vec<_> = outcomes.iter().filter_map(|o| o.as_ref().err()).collect();
    assert_eq!(refused.len(), 1);
    assert!(matches!(
        refused[0],
        CharterError::ApprovalNotPending { current: ApprovalStatus::Approved, .. }
    ));

    let queue: Vec<PendingApproval> = serde_yaml::from_str(
        &std::fs::read_to_string(t.dir.path().join(approval_queue_path())).unwrap(),
    )
    .unwrap();
    assert!(queue.iter().all(|a| a.id != request.id));
    let approved_file = approval_outcome_path(Resolution::Approved, &request.id).unwrap();
    let rejected_file = approval_outcome_path(Resolution::Rejected, &request.id).unwrap();
    assert!(t.dir.path().join(approved_file).exists());
    assert!(!t.dir.path().join(rejected_file).exists());
}

#[tokio::test]
async fn held_queue_lock_times_out_then_recovers() {
    let config = StoreConfig::new().with_lock_timeout(Duration::from_millis(100));
    let t = TestStore::with_config(config).await;
    let draft = || ApprovalDraft::new(ActionType::UpdateVision, "reword vision", "agent");

    let guard = t
        .store
        .context()
        .locks
        .lock(&t.cancel, &approval_queue_path())
        .await
        .unwrap();
    let err = t.store.approvals().create(&t.cancel, draft()).await.unwrap_err();
    assert!(err.is_retryable(), "{err:?}");
    assert!(matches!(err, CharterError::LockTimeout { .. }));

    drop(guard);
    let created = t.store.approvals().create(&t.cancel, draft()).await.unwrap();
    assert_eq!(created.status, ApprovalStatus::Pending);
    let pending = t.store.approvals().list(&t.cancel, Some(ApprovalStatus::Pending)).await.unwrap();
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn rejected_requests_move_to_the_rejected_outcome() {
    let t = TestStore::new().await;
    let approvals = t.store.approvals();
    let request = approvals
        .create(
            &t.cancel,
            ApprovalDraft::new(ActionType::RecordDecision, "adopt NATS", "agent"),
        )
        .await
        .unwrap();

    let rejected = approvals.reject(&t.cancel, &request.id, "carol").await.unwrap();
    assert_eq!(rejected.status, ApprovalStatus::Rejected);
    assert_eq!(rejected.resolved_by.as_deref(), Some("carol"));

    let fetched = approvals.get(&t.cancel, &request.id).await.unwrap();
    assert_eq!(fetched.status, ApprovalStatus::Rejected);

    let err = approvals.approve(&t.cancel, &request.id, "dave").await.unwrap_err();
    assert!(matches!(
        err,
        CharterError::ApprovalNotPending { current: ApprovalStatus::Rejected, .. }
    ));

    let err = EntityHandler::delete(approvals, &t.cancel, &request.id).await.unwrap_err();
    assert!(matches!(err, CharterError::UnsupportedOperation { .. }));
}
