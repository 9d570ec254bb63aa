//! Tests for core data types.

use genvault_core::{
    ChangesSummary, DownloadLocator, GenerationId, GenerationKey, Manifest, ManifestEntry,
    ProjectId,
};

fn entry(path: &str, size: u64) -> ManifestEntry {
    ManifestEntry {
        path: path.to_string(),
        size,
        sha256: None,
    }
}

#[test]
fn test_manifest_sorts_files_by_path() {
    let manifest = Manifest::new(
        ProjectId::new(),
        GenerationId::new(),
        2,
        vec![entry("src/b.rs", 4), entry("README.md", 10), entry("src/a.rs", 1)],
    );

    let paths: Vec<_> = manifest.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["README.md", "src/a.rs", "src/b.rs"]);
    assert_eq!(manifest.file_count, 3);
    assert_eq!(manifest.total_size_bytes(), 15);
}

#[test]
fn test_manifest_validate_rejects_count_mismatch() {
    let mut manifest = Manifest::new(ProjectId::new(), GenerationId::new(), 1, vec![entry("a", 1)]);
    manifest.file_count = 2;
    let err = manifest.validate().unwrap_err();
    assert!(err.contains("file_count"));
}

#[test]
fn test_manifest_validate_rejects_version_zero_and_duplicates() {
    let manifest = Manifest::new(ProjectId::new(), GenerationId::new(), 0, vec![]);
    assert!(manifest.validate().is_err());

    let manifest = Manifest::new(
        ProjectId::new(),
        GenerationId::new(),
        1,
        vec![entry("a", 1), entry("a", 2)],
    );
    assert!(manifest.validate().unwrap_err().contains("duplicate"));
}

#[test]
fn test_generation_key_layout() {
    let project_id = ProjectId::new();
    let generation_id = GenerationId::new();
    let key = GenerationKey::new(project_id, generation_id, 7);

    assert_eq!(key.version_dir_name(), format!("v7__{}", generation_id));
    assert_eq!(
        key.object_key(),
        format!("{}/7/{}.tar.gz", project_id, generation_id)
    );
}

#[test]
fn test_changes_summary_counts() {
    let summary = ChangesSummary {
        added: 1,
        modified: 1,
        removed: 0,
        ..ChangesSummary::default()
    };
    assert_eq!(summary.counts(), (1, 1, 0));
    assert_eq!(summary.total(), 2);
    assert!(!summary.is_empty());
    assert!(ChangesSummary::default().is_empty());

    let failed = ChangesSummary::failed("previous version unreadable");
    assert_eq!(failed.total(), 0);
    assert!(!failed.is_empty());
}

#[test]
fn test_download_locator_serializes_with_kind_tag() {
    let locator = DownloadLocator::Local {
        reference: "/var/genvault/p/generations/v1__g".to_string(),
    };
    let json = serde_json::to_value(&locator).unwrap();
    assert_eq!(json["kind"], "local");
    assert_eq!(locator.as_str(), "/var/genvault/p/generations/v1__g");
    assert!(!locator.is_signed());
}
