//! Create / read / update / delete through the typed handlers

use charter_core::model::{
    ActionType, ApprovalDraft, DecisionPatch, Level, ObjectivePatch, RiskPatch, RiskStatus,
    TaskPatch, TaskStatus,
};
use charter_core::{CharterError, EntityHandler, ListFilter};
use charter_identity::{entity_relative_path, EntityKind};
use charter_test_utils::{
    actor_draft, cancelled, consideration_draft, decision_draft, deliverable_draft,
    objective_draft, risk_draft, task_draft, vision_draft, TestStore,
};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn created_records_read_back_unchanged() {
    let t = TestStore::new().await;
    let store = &t.store;
    let cancel = &t.cancel;

    let objective = store
        .objectives()
        .add(cancel, objective_draft("Launch beta"))
        .await
        .unwrap();
    assert_eq!(objective.id, "obj-001");
    assert_eq!(store.objectives().get(cancel, &objective.id).await.unwrap(), objective);

    let deliverable = store
        .deliverables()
        .add(cancel, deliverable_draft(&objective.id, "Signup flow"))
        .await
        .unwrap();
    assert_eq!(deliverable.id, "del-001");
    assert_eq!(
        store.deliverables().get(cancel, &deliverable.id).await.unwrap(),
        deliverable
    );

    let actor = store.actors().add(cancel, actor_draft("Dana")).await.unwrap();
    let mut draft = task_draft("Write migration");
    draft.deliverable_id = Some(deliverable.id.clone());
    draft.assignee = Some(actor.id.clone());
    let task = store.tasks().add(cancel, draft).await.unwrap();
    assert_eq!(store.tasks().get(cancel, &task.id).await.unwrap(), task);

    let vision = store
        .vision()
        .add(cancel, vision_draft("Every team ships weekly"))
        .await
        .unwrap();
    assert_eq!(vision.id, "vision");
    assert_eq!(store.vision().get(cancel, "vision").await.unwrap(), vision);
}

#[tokio::test]
async fn db_outage_risk_defaults_to_medium() {
    let t = TestStore::new().await;
    let risk = t
        .store
        .risks()
        .add(&t.cancel, risk_draft("DB outage"))
        .await
        .unwrap();

    let suffix = risk.id.strip_prefix("risk-").unwrap();
    assert_eq!(suffix.len(), 8);
    assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_eq!(risk.probability, Level::Medium);
    assert_eq!(risk.impact, Level::Medium);
    assert_eq!(risk.risk_score, 4);

    let listed = t.store.risks().list(&t.cancel, &ListFilter::all()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, risk.id);
}

#[tokio::test]
async fn patch_changes_only_supplied_fields() {
    let t = TestStore::new().await;
    let mut draft = risk_draft("Vendor lock-in");
    draft.description = Some("single cloud provider".into());
    let risk = t.store.risks().add(&t.cancel, draft).await.unwrap();

    let patch = RiskPatch {
        impact: Some(Level::High),
        status: Some(RiskStatus::Accepted),
        ..RiskPatch::default()
    };
    let updated = t.store.risks().update(&t.cancel, &risk.id, patch).await.unwrap();
    assert_eq!(updated.title, risk.title);
    assert_eq!(updated.description, risk.description);
    assert_eq!(updated.impact, Level::High);
    assert_eq!(updated.risk_score, 6);
    assert_eq!(updated.status, RiskStatus::Accepted);
    assert!(updated.metadata.updated_at >= risk.metadata.updated_at);
    assert_eq!(updated.metadata.created_at, risk.metadata.created_at);
}

#[tokio::test]
async fn invalid_patch_leaves_record_untouched() {
    let t = TestStore::new().await;
    let task = t.store.tasks().add(&t.cancel, task_draft("Audit")).await.unwrap();

    let patch = TaskPatch {
        status: Some(TaskStatus::Done),
        progress: Some(140),
        ..TaskPatch::default()
    };
    let err = t.store.tasks().update(&t.cancel, &task.id, patch).await.unwrap_err();
    assert!(matches!(err, CharterError::Validation(ref e) if e.field() == Some("progress")));
    assert_eq!(t.store.tasks().get(&t.cancel, &task.id).await.unwrap(), task);
}

#[tokio::test]
async fn decisions_are_immutable() {
    let t = TestStore::new().await;
    let decision = t
        .store
        .decisions()
        .add(&t.cancel, decision_draft(None, "Use Postgres"))
        .await
        .unwrap();

    for patch in [
        DecisionPatch::default(),
        DecisionPatch {
            title: Some("Use SQLite".into()),
            ..DecisionPatch::default()
        },
    ] {
        let err = t
            .store
            .decisions()
            .update(&t.cancel, &decision.id, patch)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CharterError::Immutable { kind: EntityKind::Decision, operation: "update" }
        ));
    }

    let err = t.store.decisions().delete(&t.cancel, &decision.id).await.unwrap_err();
    assert!(matches!(err, CharterError::Immutable { operation: "delete", .. }));
    let err = t.store.decisions().delete(&t.cancel, "dec-00000000").await.unwrap_err();
    assert!(matches!(err, CharterError::Immutable { .. }));

    assert_eq!(
        t.store.decisions().get(&t.cancel, &decision.id).await.unwrap(),
        decision
    );
}

#[tokio::test]
async fn recording_a_decision_marks_its_consideration() {
    let t = TestStore::new().await;
    let consideration = t
        .store
        .considerations()
        .add(&t.cancel, consideration_draft("Which database?"))
        .await
        .unwrap();
    let decision = t
        .store
        .decisions()
        .add(&t.cancel, decision_draft(Some(&consideration.id), "Use Postgres"))
        .await
        .unwrap();

    let decided = t
        .store
        .considerations()
        .get(&t.cancel, &consideration.id)
        .await
        .unwrap();
    assert_eq!(decided.decision_id.as_deref(), Some(decision.id.as_str()));

    let err = t
        .store
        .decisions()
        .add(&t.cancel, decision_draft(Some(&consideration.id), "Use MySQL"))
        .await
        .unwrap_err();
    assert!(matches!(err, CharterError::Validation(ref e) if e.field() == Some("consideration_id")));
    assert_eq!(
        t.store.decisions().list(&t.cancel, &ListFilter::all()).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn referenced_consideration_cannot_be_deleted() {
    let t = TestStore::new().await;
    let consideration = t
        .store
        .considerations()
        .add(&t.cancel, consideration_draft("Which queue?"))
        .await
        .unwrap();
    let decision = t
        .store
        .decisions()
        .add(&t.cancel, decision_draft(Some(&consideration.id), "Use NATS"))
        .await
        .unwrap();

    let err = t
        .store
        .considerations()
        .delete(&t.cancel, &consideration.id)
        .await
        .unwrap_err();
    match err {
        CharterError::CascadeProtected { kind, id, referenced_by } => {
            assert_eq!(kind, EntityKind::Consideration);
            assert_eq!(id, consideration.id);
            assert_eq!(referenced_by, vec![format!("decision {}", decision.id)]);
        }
        other => panic!("expected cascade protection, got {other:?}"),
    }
    assert!(t
        .store
        .considerations()
        .get(&t.cancel, &consideration.id)
        .await
        .is_ok());
}

#[tokio::test]
async fn consideration_deletes_once_its_decision_is_gone() {
    let t = TestStore::new().await;
    let consideration = t
        .store
        .considerations()
        .add(&t.cancel, consideration_draft("Which queue?"))
        .await
        .unwrap();
    let decision = t
        .store
        .decisions()
        .add(&t.cancel, decision_draft(Some(&consideration.id), "Use NATS"))
        .await
        .unwrap();

    let file = entity_relative_path(EntityKind::Decision, &decision.id).unwrap();
    std::fs::remove_file(t.path().join(file)).unwrap();

    t.store
        .considerations()
        .delete(&t.cancel, &consideration.id)
        .await
        .unwrap();
    let err = t
        .store
        .considerations()
        .get(&t.cancel, &consideration.id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn objective_with_deliverables_is_protected() {
    let t = TestStore::new().await;
    let objective = t
        .store
        .objectives()
        .add(&t.cancel, objective_draft("Grow revenue"))
        .await
        .unwrap();
    t.store
        .deliverables()
        .add(&t.cancel, deliverable_draft(&objective.id, "Pricing page"))
        .await
        .unwrap();

    let err = t
        .store
        .objectives()
        .delete(&t.cancel, &objective.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CharterError::CascadeProtected { .. }));

    let unrelated = t
        .store
        .objectives()
        .add(&t.cancel, objective_draft("Hire"))
        .await
        .unwrap();
    t.store.objectives().delete(&t.cancel, &unrelated.id).await.unwrap();
}

#[tokio::test]
async fn dangling_references_are_refused_before_writing() {
    let t = TestStore::new().await;
    let before = t.snapshot();

    let err = t
        .store
        .deliverables()
        .add(&t.cancel, deliverable_draft("obj-042", "Orphan"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CharterError::NotFound { kind: EntityKind::Objective, ref id } if id == "obj-042"
    ));
    assert_eq!(t.snapshot(), before);
}

#[tokio::test]
async fn malformed_ids_are_validation_errors() {
    let t = TestStore::new().await;
    for id in ["OBJ-001", "obj-1", "obj-001/x", "risk-001"] {
        let err = t.store.objectives().get(&t.cancel, id).await.unwrap_err();
        assert!(matches!(err, CharterError::Validation(_)), "{id}: {err:?}");
    }
    let err = t
        .store
        .objectives()
        .update(&t.cancel, "../obj-001", ObjectivePatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CharterError::Validation(_) | CharterError::Security(_)));
}

#[tokio::test]
async fn cancelled_mutations_leave_disk_untouched() {
    let t = TestStore::new().await;
    let objective = t
        .store
        .objectives()
        .add(&t.cancel, objective_draft("Stabilise"))
        .await
        .unwrap();
    let risk = t.store.risks().add(&t.cancel, risk_draft("Churn")).await.unwrap();
    let consideration = t
        .store
        .considerations()
        .add(&t.cancel, consideration_draft("Message bus"))
        .await
        .unwrap();
    let task = t.store.tasks().add(&t.cancel, task_draft("Triage")).await.unwrap();
    let pending = [
        ApprovalDraft::new(ActionType::DeleteEntity, "drop stale risk", "agent"),
        ApprovalDraft::new(ActionType::UpdateVision, "reword vision", "agent"),
    ];
    let mut queued = Vec::new();
    for draft in pending {
        queued.push(t.store.approvals().create(&t.cancel, draft).await.unwrap());
    }
    let before = t.snapshot();
    let cancel = cancelled();

    let results = [
        t.store.objectives().add(&cancel, objective_draft("Late")).await.err(),
        t.store.risks().add(&cancel, risk_draft("Late")).await.err(),
        t.store
            .risks()
            .update(&cancel, &risk.id, RiskPatch::default())
            .await
            .err(),
        t.store.risks().delete(&cancel, &risk.id).await.err(),
        t.store.objectives().delete(&cancel, &objective.id).await.err(),
        t.store
            .deliverables()
            .add(&cancel, deliverable_draft(&objective.id, "Late"))
            .await
            .err(),
        t.store.tasks().add(&cancel, task_draft("Late")).await.err(),
        t.store
            .tasks()
            .update(&cancel, &task.id, TaskPatch::default())
            .await
            .err(),
        t.store.actors().add(&cancel, actor_draft("Late")).await.err(),
        t.store
            .decisions()
            .add(&cancel, decision_draft(Some(&consideration.id), "Adopt NATS"))
            .await
            .err(),
        t.store
            .approvals()
            .create(
                &cancel,
                ApprovalDraft::new(ActionType::RecordDecision, "adopt NATS", "agent"),
            )
            .await
            .err(),
        t.store
            .approvals()
            .approve(&cancel, &queued[0].id, "lead")
            .await
            .err(),
        t.store
            .approvals()
            .reject(&cancel, &queued[1].id, "lead")
            .await
            .err(),
    ];
    for err in results {
        assert!(matches!(err, Some(CharterError::Cancelled)), "{err:?}");
    }
    assert_eq!(t.snapshot(), before);
}

#[tokio::test]
async fn reopened_store_sees_records_and_continues_ids() {
    let t = TestStore::new().await;
    let first = t
        .store
        .objectives()
        .add(&t.cancel, objective_draft("Retain customers"))
        .await
        .unwrap();

    let reopened = t.reopen().await;
    assert_eq!(reopened.objectives().get(&t.cancel, &first.id).await.unwrap(), first);
    let second = reopened
        .objectives()
        .add(&t.cancel, objective_draft("Reduce costs"))
        .await
        .unwrap();
    assert_eq!(second.id, "obj-002");
}
