//! Tests for version archives.

use genvault_cloud::{pack_version, unpack_version};
use genvault_core::{FileSet, GenerationId, GenerationKey, ProjectId};
use genvault_storage::{LocalStore, ManifestCodec, VersionAnnotations, read_tree};
use tempfile::TempDir;

#[tokio::test]
async fn test_archive_carries_manifest_and_source() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path().join("local")).unwrap();
    let key = GenerationKey::new(ProjectId::new(), GenerationId::new(), 1);
    let mut files = FileSet::new();
    files.insert("a.txt".to_string(), b"alpha\n".to_vec());
    files.insert("nested/deep/b.bin".to_string(), vec![0u8, 1, 2, 255]);
    let annotations = VersionAnnotations {
        prompt: Some("make it binary".to_string()),
        parent_generation_id: None,
    };
    let receipt = store.save(&key, &files, &annotations).await.unwrap();

    let archive = pack_version(&receipt.storage_path).await.unwrap();
    assert!(!archive.is_empty());

    let destination = temp_dir.path().join("unpacked");
    let source = unpack_version(archive, &destination).await.unwrap();
    assert_eq!(source, destination.join("source"));
    assert_eq!(read_tree(&destination).await.unwrap(), files);

    let manifest = ManifestCodec::read(&destination).await.unwrap();
    assert_eq!(manifest.prompt.as_deref(), Some("make it binary"));
    assert_eq!(manifest.files.len(), 2);
}

#[tokio::test]
async fn test_pack_rejects_incomplete_directory() {
    let temp_dir = TempDir::new().unwrap();
    tokio::fs::create_dir_all(temp_dir.path().join("source"))
        .await
        .unwrap();

    assert!(pack_version(temp_dir.path()).await.is_err());
}

#[tokio::test]
async fn test_unpack_rejects_garbage() {
    let temp_dir = TempDir::new().unwrap();

    let result = unpack_version(b"not an archive".to_vec(), temp_dir.path()).await;
    assert!(result.is_err());
}
