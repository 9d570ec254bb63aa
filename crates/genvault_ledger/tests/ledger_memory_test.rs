//! Tests for the in-memory version ledger.

use genvault_core::{ChangesSummary, GenerationId, GenerationStatus, ProjectId};
use genvault_error::{GenvaultErrorKind, LedgerErrorKind};
use genvault_ledger::{Completion, GenerationDraft, InMemoryVersionLedger, VersionLedger};
use std::collections::HashSet;

fn ledger_kind(err: &genvault_error::GenvaultError) -> LedgerErrorKind {
    match err.kind() {
        GenvaultErrorKind::Ledger(e) => e.kind.clone(),
        other => panic!("expected ledger error, got {other}"),
    }
}

fn completion(path: &str) -> Completion {
    Completion {
        storage_path: path.to_string(),
        file_count: 1,
        total_size_bytes: 3,
        ..Completion::default()
    }
}

async fn completed(ledger: &InMemoryVersionLedger, project: ProjectId) -> GenerationId {
    let generation = ledger.next_version(GenerationDraft::new(project)).await.unwrap();
    ledger
        .mark_completed(generation.id, completion("/tmp/v"))
        .await
        .unwrap();
    generation.id
}

#[tokio::test]
async fn test_sequential_versions_have_no_gaps() {
    let ledger = InMemoryVersionLedger::new();
    let project = ProjectId::new();

    let mut versions = Vec::new();
    for _ in 0..10 {
        let generation = ledger.next_version(GenerationDraft::new(project)).await.unwrap();
        assert_eq!(generation.status, GenerationStatus::Processing);
        versions.push(generation.version);
    }

    assert_eq!(versions, (1..=10).collect::<Vec<u32>>());
    assert_eq!(ledger.get_project(project).await.unwrap().latest_version, 10);
}

#[tokio::test]
async fn test_projects_count_independently() {
    let ledger = InMemoryVersionLedger::new();
    let a = ProjectId::new();
    let b = ProjectId::new();

    ledger.next_version(GenerationDraft::new(a)).await.unwrap();
    ledger.next_version(GenerationDraft::new(a)).await.unwrap();
    let first_b = ledger.next_version(GenerationDraft::new(b)).await.unwrap();

    assert_eq!(first_b.version, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reservations_are_unique() {
    let ledger = InMemoryVersionLedger::new();
    let project = ProjectId::new();

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                ledger
                    .next_version(GenerationDraft::new(project))
                    .await
                    .map(|g| g.version)
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        let version = handle.await.unwrap().unwrap();
        assert!(seen.insert(version), "version {version} assigned twice");
    }
    assert_eq!(seen.len(), 50);
    assert_eq!(seen.iter().max(), Some(&50));
}

#[tokio::test]
async fn test_draft_annotations_are_recorded() {
    let ledger = InMemoryVersionLedger::new();
    let project = ProjectId::new();
    let parent = GenerationId::new();

    let generation = ledger
        .next_version(
            GenerationDraft::new(project)
                .with_prompt(Some("make it blue".to_string()))
                .with_parent(Some(parent)),
        )
        .await
        .unwrap();

    assert_eq!(generation.prompt.as_deref(), Some("make it blue"));
    assert_eq!(generation.parent_generation_id, Some(parent));
}

#[tokio::test]
async fn test_completion_records_storage_details() {
    let ledger = InMemoryVersionLedger::new();
    let project = ProjectId::new();
    let generation = ledger.next_version(GenerationDraft::new(project)).await.unwrap();

    let summary = ChangesSummary {
        added: 1,
        modified: 1,
        ..ChangesSummary::default()
    };
    let done = ledger
        .mark_completed(
            generation.id,
            Completion {
                storage_path: "/data/p/generations/v1".to_string(),
                file_count: 2,
                total_size_bytes: 10,
                diff_from_previous: Some("/data/p/generations/v1/changes.diff".to_string()),
                changes_summary: Some(summary.clone()),
            },
        )
        .await
        .unwrap();

    assert_eq!(done.status, GenerationStatus::Completed);
    assert_eq!(done.file_count, 2);
    assert_eq!(done.changes_summary, Some(summary));
    assert!(done.completed_at.is_some());

    let err = ledger
        .mark_completed(generation.id, completion("/elsewhere"))
        .await
        .unwrap_err();
    assert!(matches!(ledger_kind(&err), LedgerErrorKind::InvalidState(_)));
}

#[tokio::test]
async fn test_failed_generation_keeps_its_version() {
    let ledger = InMemoryVersionLedger::new();
    let project = ProjectId::new();
    let generation = ledger.next_version(GenerationDraft::new(project)).await.unwrap();

    let failed = ledger.mark_failed(generation.id, "disk full").await.unwrap();
    assert_eq!(failed.status, GenerationStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("disk full"));

    let next = ledger.next_version(GenerationDraft::new(project)).await.unwrap();
    assert_eq!(next.version, 2);
}

#[tokio::test]
async fn test_activation_is_exclusive() {
    let ledger = InMemoryVersionLedger::new();
    let project = ProjectId::new();
    let a = completed(&ledger, project).await;
    let b = completed(&ledger, project).await;

    ledger.activate(project, a).await.unwrap();
    ledger.activate(project, b).await.unwrap();

    let active: Vec<_> = ledger
        .list_generations(project)
        .await
        .unwrap()
        .into_iter()
        .filter(|g| g.is_active)
        .map(|g| g.id)
        .collect();
    assert_eq!(active, vec![b]);
    assert_eq!(
        ledger.get_project(project).await.unwrap().active_generation_id,
        Some(b)
    );
}

#[tokio::test]
async fn test_deactivate_clears_active_generation() {
    let ledger = InMemoryVersionLedger::new();
    let project = ProjectId::new();
    let a = completed(&ledger, project).await;

    assert!(ledger.deactivate(project).await.unwrap().is_none());

    ledger.activate(project, a).await.unwrap();
    let cleared = ledger.deactivate(project).await.unwrap().unwrap();

    assert_eq!(cleared.id, a);
    assert!(!cleared.is_active);
    assert!(!ledger.get_generation(a).await.unwrap().is_active);
    assert_eq!(ledger.get_project(project).await.unwrap().active_generation_id, None);
}

#[tokio::test]
async fn test_activation_guards() {
    let ledger = InMemoryVersionLedger::new();
    let project = ProjectId::new();
    let other = ProjectId::new();
    let done = completed(&ledger, project).await;
    let pending = ledger.next_version(GenerationDraft::new(project)).await.unwrap();

    let err = ledger.activate(other, done).await.unwrap_err();
    assert!(matches!(ledger_kind(&err), LedgerErrorKind::NotFound(_)));

    let err = ledger.activate(project, pending.id).await.unwrap_err();
    assert!(matches!(ledger_kind(&err), LedgerErrorKind::InvalidState(_)));

    let err = ledger.activate(project, GenerationId::new()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_guards() {
    let ledger = InMemoryVersionLedger::new();
    let project = ProjectId::new();
    let only = completed(&ledger, project).await;

    let err = ledger.delete(only).await.unwrap_err();
    assert!(matches!(
        ledger_kind(&err),
        LedgerErrorKind::SoleGenerationProtected(_)
    ));

    let second = completed(&ledger, project).await;
    ledger.activate(project, second).await.unwrap();

    let err = ledger.delete(second).await.unwrap_err();
    assert!(matches!(
        ledger_kind(&err),
        LedgerErrorKind::ActiveGenerationProtected(_)
    ));

    let removed = ledger.delete(only).await.unwrap();
    assert_eq!(removed.version, 1);
    assert!(ledger.get_generation(only).await.unwrap_err().is_not_found());

    // Deletion never rewinds the counter.
    let third = ledger.next_version(GenerationDraft::new(project)).await.unwrap();
    assert_eq!(third.version, 3);
}

#[tokio::test]
async fn test_lookup_by_version() {
    let ledger = InMemoryVersionLedger::new();
    let project = ProjectId::new();
    let first = completed(&ledger, project).await;

    let found = ledger.generation_by_version(project, 1).await.unwrap();
    assert_eq!(found.map(|g| g.id), Some(first));
    assert!(ledger.generation_by_version(project, 2).await.unwrap().is_none());
    assert!(ledger.get_project(ProjectId::new()).await.unwrap_err().is_not_found());
}
