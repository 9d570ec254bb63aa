//! Tests for the local tier.

use genvault_core::{FileSet, GenerationId, GenerationKey, ProjectId};
use genvault_error::{GenvaultErrorKind, StorageErrorKind};
use genvault_storage::{LocalStore, ManifestCodec, VersionAnnotations, layout};
use tempfile::TempDir;

fn files(entries: &[(&str, &str)]) -> FileSet {
    entries
        .iter()
        .map(|(path, text)| (path.to_string(), text.as_bytes().to_vec()))
        .collect()
}

fn storage_kind(err: &genvault_error::GenvaultError) -> StorageErrorKind {
    match err.kind() {
        GenvaultErrorKind::Storage(e) => e.kind.clone(),
        other => panic!("expected storage error, got {other}"),
    }
}

#[tokio::test]
async fn test_save_and_read_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path()).unwrap();
    let key = GenerationKey::new(ProjectId::new(), GenerationId::new(), 1);
    let input = files(&[("a.py", "x=1\n"), ("lib/util/b.py", "y=2\n")]);

    let receipt = store
        .save(&key, &input, &VersionAnnotations::default())
        .await
        .unwrap();

    assert_eq!(receipt.file_count, 2);
    assert_eq!(receipt.total_size_bytes, 8);
    assert_eq!(receipt.storage_path, store.version_dir(&key));
    assert!(store.exists(&key).await);

    let read_back = store.read(&receipt.storage_path).await.unwrap();
    assert_eq!(read_back, input);

    let single = store
        .read_file(&receipt.storage_path, "lib/util/b.py")
        .await
        .unwrap();
    assert_eq!(single, b"y=2\n");
}

#[tokio::test]
async fn test_manifest_records_files_and_annotations() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path()).unwrap();
    let parent = GenerationId::new();
    let key = GenerationKey::new(ProjectId::new(), GenerationId::new(), 3);
    let annotations = VersionAnnotations {
        prompt: Some("build a todo app".to_string()),
        parent_generation_id: Some(parent),
    };

    let receipt = store
        .save(&key, &files(&[("z.txt", "z"), ("a.txt", "aa")]), &annotations)
        .await
        .unwrap();
    let manifest = store.read_manifest(&receipt.storage_path).await.unwrap();

    assert_eq!(manifest.version, 3);
    assert_eq!(manifest.generation_id, key.generation_id);
    assert_eq!(manifest.project_id, key.project_id);
    assert_eq!(manifest.file_count, 2);
    assert_eq!(manifest.files[0].path, "a.txt");
    assert_eq!(manifest.files[0].size, 2);
    assert!(manifest.files[0].sha256.is_some());
    assert_eq!(manifest.prompt.as_deref(), Some("build a todo app"));
    assert_eq!(manifest.parent_generation_id, Some(parent));
}

#[tokio::test]
async fn test_escaping_path_is_rejected_before_writing() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path()).unwrap();
    let key = GenerationKey::new(ProjectId::new(), GenerationId::new(), 1);

    let err = store
        .save(
            &key,
            &files(&[("ok.txt", "fine"), ("../etc/passwd", "nope")]),
            &VersionAnnotations::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(storage_kind(&err), StorageErrorKind::InvalidPath(_)));
    assert!(!store.version_dir(&key).exists());
    assert!(!temp_dir.path().join("etc").exists());
}

#[tokio::test]
async fn test_partial_write_is_rolled_back() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path()).unwrap();
    let key = GenerationKey::new(ProjectId::new(), GenerationId::new(), 1);

    // "a" is written as a file, so "a/b" cannot get its parent directory.
    let err = store
        .save(
            &key,
            &files(&[("a", "file"), ("a/b", "nested")]),
            &VersionAnnotations::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(storage_kind(&err), StorageErrorKind::WriteFailure(_)));
    assert!(!store.version_dir(&key).exists());
}

#[tokio::test]
async fn test_version_directory_is_written_once() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path()).unwrap();
    let key = GenerationKey::new(ProjectId::new(), GenerationId::new(), 1);
    let input = files(&[("a.txt", "first")]);

    store
        .save(&key, &input, &VersionAnnotations::default())
        .await
        .unwrap();
    let err = store
        .save(&key, &files(&[("a.txt", "second")]), &VersionAnnotations::default())
        .await
        .unwrap_err();

    assert!(matches!(storage_kind(&err), StorageErrorKind::WriteFailure(_)));
    let kept = store.read(&store.version_dir(&key)).await.unwrap();
    assert_eq!(kept, input);
}

#[tokio::test]
async fn test_read_missing_file_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path()).unwrap();
    let key = GenerationKey::new(ProjectId::new(), GenerationId::new(), 1);
    let receipt = store
        .save(&key, &files(&[("a.txt", "a")]), &VersionAnnotations::default())
        .await
        .unwrap();

    let err = store
        .read_file(&receipt.storage_path, "missing.txt")
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = store
        .read(&temp_dir.path().join("nowhere"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path()).unwrap();
    let key = GenerationKey::new(ProjectId::new(), GenerationId::new(), 1);
    let receipt = store
        .save(&key, &files(&[("a.txt", "a")]), &VersionAnnotations::default())
        .await
        .unwrap();

    store.delete(&receipt.storage_path).await.unwrap();
    assert!(!receipt.storage_path.exists());
    store.delete(&receipt.storage_path).await.unwrap();
}

#[tokio::test]
async fn test_list_versions_ignores_pointer_and_orders_by_version() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path()).unwrap();
    let project = ProjectId::new();
    let mut expected = Vec::new();

    for version in [2u32, 1, 3] {
        let key = GenerationKey::new(project, GenerationId::new(), version);
        store
            .save(&key, &files(&[("a.txt", "a")]), &VersionAnnotations::default())
            .await
            .unwrap();
        expected.push((version, key.generation_id));
    }
    std::fs::write(store.generations_dir(project).join(layout::ACTIVE_POINTER), "x").unwrap();
    expected.sort();

    assert_eq!(store.list_versions(project).await.unwrap(), expected);
    assert!(store.list_versions(ProjectId::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_manifest_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path()).unwrap();
    let key = GenerationKey::new(ProjectId::new(), GenerationId::new(), 1);
    let receipt = store
        .save(&key, &files(&[("a.txt", "a")]), &VersionAnnotations::default())
        .await
        .unwrap();

    std::fs::write(ManifestCodec::path(&receipt.storage_path), b"{ not json").unwrap();
    let err = store.read_manifest(&receipt.storage_path).await.unwrap_err();
    assert!(matches!(storage_kind(&err), StorageErrorKind::CorruptManifest(_)));
}

#[tokio::test]
async fn test_diff_between_stored_versions() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path()).unwrap();
    let project_id = ProjectId::new();
    let v1 = GenerationKey::new(project_id, GenerationId::new(), 1);
    let v2 = GenerationKey::new(project_id, GenerationId::new(), 2);

    let from = store
        .save(&v1, &files(&[("a.py", "x=1\n")]), &VersionAnnotations::default())
        .await
        .unwrap();
    let to = store
        .save(
            &v2,
            &files(&[("a.py", "x=2\n"), ("b.py", "new\n")]),
            &VersionAnnotations::default(),
        )
        .await
        .unwrap();

    let diff = store.diff(&from.storage_path, &to.storage_path).await.unwrap();
    assert_eq!(diff.summary.counts(), (1, 1, 0));
    assert!(diff.diff_text.contains("-x=1"));
    assert!(diff.diff_text.contains("+x=2"));
}

#[tokio::test]
async fn test_timed_out_write_leaves_no_directory() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path())
        .unwrap()
        .with_write_timeout(std::time::Duration::ZERO);
    let key = GenerationKey::new(ProjectId::new(), GenerationId::new(), 1);
    let payload = "x".repeat(16 * 1024);
    let input: FileSet = (0..500)
        .map(|i| (format!("pkg/{i:03}/mod.py"), payload.clone().into_bytes()))
        .collect();

    let err = store
        .save(&key, &input, &VersionAnnotations::default())
        .await
        .unwrap_err();
    assert!(matches!(storage_kind(&err), StorageErrorKind::Timeout(_)));

    // Nothing from the cancelled writer reappears after the rollback
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert!(!store.version_dir(&key).exists());
    assert!(!store.exists(&key).await);
}
