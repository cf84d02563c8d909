use std::sync::Arc;
use std::thread;

use conductor_core::models::{
    CoreError, CoreErrorKind, OwnerId, Payload, TaskId, TaskRecord, TaskStatus, WorkflowRequest,
    text_payload,
};
use conductor_core::store::{InMemoryTaskStore, TaskStore};

fn record(owner: i64) -> TaskRecord {
    TaskRecord::pending(
        TaskId::new(),
        OwnerId(owner),
        WorkflowRequest::new("a1", "t1", "c1", text_payload("prompt", "hello")),
    )
}

#[test]
fn insert_rejects_duplicate_ids() {
    let store = InMemoryTaskStore::new();
    let first = record(1);
    store.insert(first.clone()).unwrap();

    let error = store.insert(first).unwrap_err();
    assert_eq!(error.kind, CoreErrorKind::DuplicateId);
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn get_unknown_id_is_not_found() {
    let store = InMemoryTaskStore::new();
    let missing = TaskId::new();

    let error = store.get(missing).unwrap_err();
    assert_eq!(error.kind, CoreErrorKind::NotFound);
    assert_eq!(error.task, Some(missing));
}

#[test]
fn list_returns_only_records_of_the_requested_owner() {
    let store = InMemoryTaskStore::new();
    let mine = [record(1), record(1)];
    for entry in mine.iter().cloned().chain([record(2), record(3)]) {
        store.insert(entry).unwrap();
    }

    let listed = store.list(OwnerId(1)).unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|entry| entry.owner == OwnerId(1)));
    for expected in &mine {
        assert!(listed.iter().any(|entry| entry.id == expected.id));
    }

    assert!(store.list(OwnerId(99)).unwrap().is_empty());
}

#[test]
fn mutate_applies_legal_transitions() {
    let store = InMemoryTaskStore::new();
    let pending = record(1);
    store.insert(pending.clone()).unwrap();

    let running = store
        .mutate(pending.id, Box::new(|entry: &mut TaskRecord| entry.start()))
        .unwrap();
    assert_eq!(running.status, TaskStatus::Running);
    assert_eq!(store.get(pending.id).unwrap(), running);

    let completed = store
        .mutate(
            pending.id,
            Box::new(|entry: &mut TaskRecord| entry.complete(text_payload("text", "done"))),
        )
        .unwrap();
    assert_eq!(completed.status, TaskStatus::Completed);
    assert!(completed.ended_at.is_some());
    assert!(completed.error.is_none());
}

#[test]
fn failed_transform_leaves_record_unchanged() {
    let store = InMemoryTaskStore::new();
    let pending = record(1);
    store.insert(pending.clone()).unwrap();

    let error = store
        .mutate(
            pending.id,
            Box::new(|entry: &mut TaskRecord| {
                entry.error = Some("half-applied".to_string());
                Err(CoreError::validation("rejected"))
            }),
        )
        .unwrap_err();

    assert_eq!(error.kind, CoreErrorKind::Validation);
    assert_eq!(store.get(pending.id).unwrap(), pending);
}

#[test]
fn mutate_rejects_updates_that_break_record_invariants() {
    let store = InMemoryTaskStore::new();
    let pending = record(1);
    store.insert(pending.clone()).unwrap();

    let skipped = store
        .mutate(
            pending.id,
            Box::new(|entry: &mut TaskRecord| {
                entry.status = TaskStatus::Completed;
                entry.output = Some(Payload::new());
                entry.ended_at = Some(chrono::Utc::now());
                Ok(())
            }),
        )
        .unwrap_err();
    assert_eq!(skipped.kind, CoreErrorKind::InvalidStateTransition);

    let reassigned = store
        .mutate(
            pending.id,
            Box::new(|entry: &mut TaskRecord| {
                entry.owner = OwnerId(2);
                Ok(())
            }),
        )
        .unwrap_err();
    assert_eq!(reassigned.kind, CoreErrorKind::Internal);

    assert_eq!(store.get(pending.id).unwrap(), pending);
}

#[test]
fn mutate_unknown_id_is_not_found() {
    let store = InMemoryTaskStore::new();
    let error = store
        .mutate(TaskId::new(), Box::new(|entry: &mut TaskRecord| entry.start()))
        .unwrap_err();
    assert_eq!(error.kind, CoreErrorKind::NotFound);
}

#[test]
fn concurrent_cancel_attempts_commit_exactly_once() {
    let store = Arc::new(InMemoryTaskStore::new());
    let pending = record(1);
    store.insert(pending.clone()).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            let task_id = pending.id;
            thread::spawn(move || {
                store
                    .mutate(
                        task_id,
                        Box::new(|entry: &mut TaskRecord| entry.cancel("cancelled by user")),
                    )
                    .is_ok()
            })
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|committed| *committed)
        .count();

    assert_eq!(successes, 1);
    assert_eq!(store.get(pending.id).unwrap().status, TaskStatus::Cancelled);
}
