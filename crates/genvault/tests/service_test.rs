//! Tests for the generation service.

use genvault::{
    CacheConfig, CacheManager, CloudTier, DeleteTargets, FileSet, GenerationRequest,
    GenerationService, GenerationStatus, GenvaultConfig, GenvaultErrorKind, HybridStorage,
    InMemoryVersionLedger, LedgerErrorKind, LocalStore, ProjectId, ReplicationConfig,
    StorageConfig, open_storage,
};
use genvault_cloud::InMemoryObjectStore;
use std::sync::Arc;
use tempfile::TempDir;

fn files(entries: &[(&str, &str)]) -> FileSet {
    entries
        .iter()
        .map(|(path, text)| (path.to_string(), text.as_bytes().to_vec()))
        .collect()
}

fn request(project_id: ProjectId, files: FileSet, activate: bool) -> GenerationRequest {
    GenerationRequest::builder()
        .project_id(project_id)
        .files(files)
        .prompt(Some("make a script".to_string()))
        .activate(activate)
        .build()
        .unwrap()
}

fn service(temp_dir: &TempDir, cloud: CloudTier) -> GenerationService {
    let storage = HybridStorage::new(
        LocalStore::new(temp_dir.path().join("local")).unwrap(),
        cloud,
        CacheManager::new(temp_dir.path().join("cache")).unwrap(),
    )
    .with_replication(ReplicationConfig::new(2, 1, 10));
    GenerationService::new(Arc::new(InMemoryVersionLedger::new()), storage)
}

fn ledger_kind(err: &genvault::GenvaultError) -> Option<LedgerErrorKind> {
    match err.kind() {
        GenvaultErrorKind::Ledger(e) => Some(e.kind.clone()),
        _ => None,
    }
}

#[tokio::test]
async fn test_second_save_records_diff() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir, CloudTier::disabled());
    let project_id = ProjectId::new();

    let first = service
        .save(request(project_id, files(&[("a.py", "x=1")]), false))
        .await
        .unwrap();
    assert_eq!(first.generation.version, 1);
    assert_eq!(first.generation.status, GenerationStatus::Completed);
    assert!(first.generation.diff_from_previous.is_none());
    assert!(first.generation.changes_summary.is_none());

    let second = service
        .save(request(
            project_id,
            files(&[("a.py", "x=2"), ("b.py", "new")]),
            false,
        ))
        .await
        .unwrap();
    assert_eq!(second.generation.version, 2);
    assert_eq!(second.generation.file_count, 2);

    let summary = second.generation.changes_summary.clone().unwrap();
    assert_eq!(summary.counts(), (1, 1, 0));
    assert!(summary.diff_error.is_none());

    let diff_path = second.generation.diff_from_previous.clone().unwrap();
    let diff_text = tokio::fs::read_to_string(&diff_path).await.unwrap();
    assert!(diff_text.contains("-x=1"));
    assert!(diff_text.contains("+x=2"));
}

#[tokio::test]
async fn test_unreadable_previous_version_still_completes_save() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir, CloudTier::disabled());
    let project_id = ProjectId::new();

    let first = service
        .save(request(project_id, files(&[("a.py", "x=1")]), false))
        .await
        .unwrap();
    assert!(
        service
            .storage()
            .delete(&first.generation.key(), DeleteTargets::local_only())
            .await
    );

    let second = service
        .save(request(project_id, files(&[("a.py", "x=2")]), false))
        .await
        .unwrap();

    assert_eq!(second.generation.status, GenerationStatus::Completed);
    assert!(second.generation.diff_from_previous.is_none());
    let summary = second.generation.changes_summary.clone().unwrap();
    assert!(summary.diff_error.is_some());
    assert_eq!(summary.counts(), (0, 0, 0));
}

#[tokio::test]
async fn test_activation_is_exclusive() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir, CloudTier::disabled());
    let project_id = ProjectId::new();

    let first = service
        .save(request(project_id, files(&[("a.py", "x=1")]), true))
        .await
        .unwrap();
    assert!(first.is_active());
    assert!(first.activation_error.is_none());

    let second = service
        .save(request(project_id, files(&[("a.py", "x=2")]), true))
        .await
        .unwrap();
    assert!(second.is_active());

    let first = service.get_generation(first.generation.id).await.unwrap();
    assert!(!first.is_active);

    let active = service.active_generation(project_id).await.unwrap().unwrap();
    assert_eq!(active.id, second.generation.id);
    assert_eq!(
        service.pointer().active_version(project_id).await.unwrap(),
        Some((2, second.generation.id))
    );
}

#[tokio::test]
async fn test_activate_rejects_failed_generation() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir, CloudTier::disabled());
    let project_id = ProjectId::new();

    service
        .save(request(project_id, files(&[("../x", "escape")]), false))
        .await
        .unwrap_err();
    let failed = service.list_generations(project_id).await.unwrap().remove(0);

    let err = service.activate(project_id, failed.id).await.unwrap_err();
    assert!(matches!(ledger_kind(&err), Some(LedgerErrorKind::InvalidState(_))));
    assert!(service.active_generation(project_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_write_marks_generation_failed() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir, CloudTier::disabled());
    let project_id = ProjectId::new();

    let err = service
        .save(request(project_id, files(&[("../x", "escape")]), false))
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), GenvaultErrorKind::Storage(_)));

    let generations = service.list_generations(project_id).await.unwrap();
    assert_eq!(generations.len(), 1);
    assert_eq!(generations[0].status, GenerationStatus::Failed);
    assert!(generations[0].error_message.is_some());

    // Version numbers are never reused
    let next = service
        .save(request(project_id, files(&[("a.py", "x=1")]), false))
        .await
        .unwrap();
    assert_eq!(next.generation.version, 2);
    assert!(next.generation.diff_from_previous.is_none());
}

#[tokio::test]
async fn test_delete_guards() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir, CloudTier::disabled());
    let project_id = ProjectId::new();

    let only = service
        .save(request(project_id, files(&[("a.py", "x=1")]), false))
        .await
        .unwrap();
    let err = service
        .delete(only.generation.id, DeleteTargets::both())
        .await
        .unwrap_err();
    assert!(matches!(
        ledger_kind(&err),
        Some(LedgerErrorKind::SoleGenerationProtected(_))
    ));

    service.activate(project_id, only.generation.id).await.unwrap();
    let second = service
        .save(request(project_id, files(&[("a.py", "x=2")]), false))
        .await
        .unwrap();

    let err = service
        .delete(only.generation.id, DeleteTargets::both())
        .await
        .unwrap_err();
    assert!(matches!(
        ledger_kind(&err),
        Some(LedgerErrorKind::ActiveGenerationProtected(_))
    ));

    let deleted = service
        .delete(second.generation.id, DeleteTargets::local_only())
        .await
        .unwrap();
    assert!(deleted.content_removed);
    assert!(!service.storage().local().exists(&second.generation.key()).await);
    assert!(service.get_generation(second.generation.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_repair_active_pointer() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir, CloudTier::disabled());
    let project_id = ProjectId::new();

    let saved = service
        .save(request(project_id, files(&[("a.py", "x=1")]), true))
        .await
        .unwrap();
    tokio::fs::remove_file(service.pointer().pointer_path(project_id))
        .await
        .unwrap();
    assert!(service.pointer().get_active(project_id).await.unwrap().is_none());

    let repaired = service.repair_active_pointer(project_id).await.unwrap();
    let expected = service.storage().local().version_dir(&saved.generation.key());
    assert_eq!(repaired, Some(expected.clone()));
    assert_eq!(
        service.pointer().get_active(project_id).await.unwrap(),
        Some(expected)
    );
}

#[tokio::test]
async fn test_repair_without_active_generation_clears_pointer() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir, CloudTier::disabled());
    let project_id = ProjectId::new();

    service
        .save(request(project_id, files(&[("a.py", "x=1")]), false))
        .await
        .unwrap();

    assert_eq!(service.repair_active_pointer(project_id).await.unwrap(), None);
    assert!(service.pointer().get_active(project_id).await.unwrap().is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn test_pointer_swap_failure_restores_previous_activation() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir, CloudTier::disabled());
    let project_id = ProjectId::new();

    let first = service
        .save(request(project_id, files(&[("a.py", "x=1")]), true))
        .await
        .unwrap();

    // A non-empty directory where the pointer belongs cannot be replaced
    let pointer = service.pointer().pointer_path(project_id);
    tokio::fs::remove_file(&pointer).await.unwrap();
    tokio::fs::create_dir(&pointer).await.unwrap();
    tokio::fs::write(pointer.join("blocker"), b"x").await.unwrap();

    let second = service
        .save(request(project_id, files(&[("a.py", "x=2")]), true))
        .await
        .unwrap();
    assert!(second.activation_error.is_some());
    assert!(!second.is_active());
    assert_eq!(second.generation.status, GenerationStatus::Completed);

    let project = service.get_project(project_id).await.unwrap();
    assert_eq!(project.active_generation_id, Some(first.generation.id));
    assert!(service.get_generation(first.generation.id).await.unwrap().is_active);
    assert!(!service.get_generation(second.generation.id).await.unwrap().is_active);
}

#[tokio::test]
async fn test_compare_versions() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir, CloudTier::disabled());
    let project_id = ProjectId::new();

    for contents in [
        vec![("a.py", "x=1"), ("old.py", "gone")],
        vec![("a.py", "x=2"), ("old.py", "gone")],
        vec![("a.py", "x=3"), ("c.py", "fresh")],
    ] {
        service
            .save(request(project_id, files(&contents), false))
            .await
            .unwrap();
    }

    let diff = service.compare(project_id, 1, 3).await.unwrap();
    assert_eq!(diff.summary.counts(), (1, 1, 1));

    let err = service.compare(project_id, 1, 7).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_read_files_falls_back_to_cloud() {
    let temp_dir = TempDir::new().unwrap();
    let store = InMemoryObjectStore::new();
    let service = service(&temp_dir, CloudTier::new(Arc::new(store.clone())));
    let project_id = ProjectId::new();
    let input = files(&[("a.py", "x=1"), ("pkg/b.py", "y=2")]);

    let saved = service
        .save(request(project_id, input.clone(), false))
        .await
        .unwrap();
    service.storage().flush_replication().await;
    assert_eq!(service.read_files(saved.generation.id).await.unwrap(), input);

    assert!(
        service
            .storage()
            .delete(&saved.generation.key(), DeleteTargets::local_only())
            .await
    );
    assert_eq!(service.read_files(saved.generation.id).await.unwrap(), input);
}

#[tokio::test]
async fn test_download_url_without_cloud_is_local() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir, CloudTier::disabled());
    let project_id = ProjectId::new();

    let saved = service
        .save(request(project_id, files(&[("a.py", "x=1")]), false))
        .await
        .unwrap();
    let locator = service
        .download_url(saved.generation.id, None)
        .await
        .unwrap();

    assert!(!locator.is_signed());
    assert_eq!(
        Some(locator.as_str()),
        saved.generation.storage_path.as_deref()
    );
}

#[tokio::test]
async fn test_open_storage_starts_cache_sweeper() {
    let temp_dir = TempDir::new().unwrap();
    let config = GenvaultConfig::default()
        .with_storage(StorageConfig::with_root(temp_dir.path().join("local")))
        .with_cache(
            CacheConfig::default()
                .with_root(temp_dir.path().join("cache"))
                .with_sweep_interval_secs(0),
        );

    let storage = open_storage(&config).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert!(storage.is_sweeping());
}
