//! Tests for the active pointer.

use genvault_core::{FileSet, GenerationId, GenerationKey, ProjectId};
use genvault_error::{GenvaultErrorKind, StorageErrorKind};
use genvault_storage::{ActivePointer, LocalStore, VersionAnnotations};
use tempfile::TempDir;

async fn saved_key(store: &LocalStore, project: ProjectId, version: u32) -> GenerationKey {
    let key = GenerationKey::new(project, GenerationId::new(), version);
    let mut files = FileSet::new();
    files.insert("main.py".to_string(), format!("v={version}\n").into_bytes());
    store
        .save(&key, &files, &VersionAnnotations::default())
        .await
        .unwrap();
    key
}

#[tokio::test]
async fn test_no_pointer_resolves_to_none() {
    let temp_dir = TempDir::new().unwrap();
    let pointer = ActivePointer::new(temp_dir.path());
    assert_eq!(pointer.get_active(ProjectId::new()).await.unwrap(), None);
}

#[tokio::test]
async fn test_set_and_redirect_pointer() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path()).unwrap();
    let pointer = ActivePointer::new(temp_dir.path());
    let project = ProjectId::new();

    let v1 = saved_key(&store, project, 1).await;
    let v2 = saved_key(&store, project, 2).await;

    let resolved = pointer.set_active(&v1).await.unwrap();
    assert_eq!(resolved, store.version_dir(&v1));
    assert_eq!(
        pointer.get_active(project).await.unwrap(),
        Some(store.version_dir(&v1))
    );

    pointer.set_active(&v2).await.unwrap();
    assert_eq!(
        pointer.get_active(project).await.unwrap(),
        Some(store.version_dir(&v2))
    );
    assert_eq!(
        pointer.active_version(project).await.unwrap(),
        Some((2, v2.generation_id))
    );

    // Resolving through the pointer reaches the version's files.
    let main = pointer.pointer_path(project).join("source").join("main.py");
    assert_eq!(std::fs::read_to_string(main).unwrap(), "v=2\n");

    // No temporary pointers are left behind.
    let leftovers = std::fs::read_dir(store.generations_dir(project))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_missing_target_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path()).unwrap();
    let pointer = ActivePointer::new(temp_dir.path());
    let project = ProjectId::new();
    let v1 = saved_key(&store, project, 1).await;
    pointer.set_active(&v1).await.unwrap();

    let ghost = GenerationKey::new(project, GenerationId::new(), 2);
    let err = pointer.set_active(&ghost).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        pointer.get_active(project).await.unwrap(),
        Some(store.version_dir(&v1))
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_swap_reports_pointer_error() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path()).unwrap();
    let pointer = ActivePointer::new(temp_dir.path());
    let project = ProjectId::new();
    let v1 = saved_key(&store, project, 1).await;

    // A real directory where the pointer belongs cannot be replaced by a link.
    std::fs::create_dir_all(pointer.pointer_path(project).join("occupied")).unwrap();

    let err = pointer.set_active(&v1).await.unwrap_err();
    match err.kind() {
        GenvaultErrorKind::Storage(e) => {
            assert!(matches!(e.kind, StorageErrorKind::PointerSwapFailed(_)))
        }
        other => panic!("expected storage error, got {other}"),
    }
    assert!(pointer.pointer_path(project).join("occupied").is_dir());
}

#[tokio::test]
async fn test_dangling_pointer_resolves_to_none() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path()).unwrap();
    let pointer = ActivePointer::new(temp_dir.path());
    let project = ProjectId::new();
    let v1 = saved_key(&store, project, 1).await;

    pointer.set_active(&v1).await.unwrap();
    store.delete(&store.version_dir(&v1)).await.unwrap();

    assert_eq!(pointer.get_active(project).await.unwrap(), None);
    pointer.clear(project).await.unwrap();
    pointer.clear(project).await.unwrap();
}
