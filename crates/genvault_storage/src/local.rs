//! Hierarchical local store.
//!
//! Every generation is written once under a deterministic directory keyed by
//! project, version and generation id. A version directory is never
//! rewritten; new content always means a new version.

use crate::layout::{self, DIFF_FILE, SOURCE_DIR};
use crate::manifest::ManifestCodec;
use genvault_core::{
    FileSet, GenerationId, GenerationKey, Manifest, ManifestEntry, ProjectId, SaveReceipt,
};
use genvault_error::{GenvaultError, GenvaultResult, StorageError, StorageErrorKind};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use walkdir::WalkDir;

/// Manifest annotations supplied by the generation pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionAnnotations {
    /// Prompt text that produced the files
    pub prompt: Option<String>,
    /// Generation this one iterates on
    pub parent_generation_id: Option<GenerationId>,
}

/// Local disk tier.
///
/// # Example Structure
///
/// ```text
/// /var/genvault/
/// └── 6f1c.../generations/
///     ├── v1__a3b9.../
///     │   ├── manifest.json
///     │   └── source/
///     │       └── app/main.py
///     └── active -> v1__a3b9...
/// ```
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    write_timeout: Duration,
}

impl LocalStore {
    /// Default deadline for writing one version.
    pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(120);

    /// Create a local store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or accessed.
    #[tracing::instrument(skip(root))]
    pub fn new(root: impl Into<PathBuf>) -> GenvaultResult<Self> {
        let root = root.into();

        std::fs::create_dir_all(&root).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                root.display(),
                e
            )))
        })?;

        tracing::info!(path = %root.display(), "Created local generation store");
        Ok(Self {
            root,
            write_timeout: Self::DEFAULT_WRITE_TIMEOUT,
        })
    }

    /// Override the per-save write deadline.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a project's version directories.
    pub fn generations_dir(&self, project_id: ProjectId) -> PathBuf {
        layout::generations_dir(&self.root, project_id)
    }

    /// Version directory for `key` (does not imply existence).
    pub fn version_dir(&self, key: &GenerationKey) -> PathBuf {
        layout::version_dir(&self.root, key)
    }

    /// Whether `key` has a materialized version directory with a manifest.
    pub async fn exists(&self, key: &GenerationKey) -> bool {
        tokio::fs::try_exists(ManifestCodec::path(&self.version_dir(key)))
            .await
            .unwrap_or(false)
    }

    /// Write a generation's files and manifest.
    ///
    /// All paths are validated before anything touches disk. On any write
    /// failure the partially written version directory is removed and the
    /// call fails with `WriteFailure`.
    ///
    /// # Errors
    ///
    /// - `InvalidPath` if a path escapes the version root or two paths collide
    /// - `WriteFailure` on I/O errors or if the version directory already exists
    /// - `Timeout` if the write exceeds the configured deadline
    #[tracing::instrument(skip(self, key, files, annotations), fields(key = %key, files = files.len()))]
    pub async fn save(
        &self,
        key: &GenerationKey,
        files: &FileSet,
        annotations: &VersionAnnotations,
    ) -> GenvaultResult<SaveReceipt> {
        let planned = plan_writes(files)?;
        let version_dir = self.version_dir(key);

        if tokio::fs::try_exists(&version_dir).await.unwrap_or(false) {
            return Err(StorageError::new(StorageErrorKind::WriteFailure(format!(
                "version directory already exists: {}",
                version_dir.display()
            )))
            .into());
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let mut task = tokio::task::spawn_blocking({
            let version_dir = version_dir.clone();
            let key = *key;
            let annotations = annotations.clone();
            let cancelled = Arc::clone(&cancelled);
            move || write_version(&version_dir, &key, &planned, &annotations, &cancelled)
        });

        let outcome = match tokio::time::timeout(self.write_timeout, &mut task).await {
            Ok(joined) => joined.unwrap_or_else(|e| Err(join_failure(e))),
            Err(_) => {
                cancelled.store(true, Ordering::SeqCst);
                // The writer stops at its next file boundary; rollback must run after it
                if let Err(e) = (&mut task).await {
                    tracing::warn!(error = %e, "Cancelled local write did not join cleanly");
                }
                Err(StorageError::new(StorageErrorKind::Timeout(format!(
                    "writing {} exceeded {:?}",
                    version_dir.display(),
                    self.write_timeout
                )))
                .into())
            }
        };

        match outcome {
            Ok(manifest) => {
                let receipt = SaveReceipt {
                    storage_path: version_dir.clone(),
                    file_count: manifest.file_count,
                    total_size_bytes: manifest.total_size_bytes(),
                };
                tracing::info!(
                    path = %version_dir.display(),
                    file_count = receipt.file_count,
                    total_size_bytes = receipt.total_size_bytes,
                    "Saved generation locally"
                );
                Ok(receipt)
            }
            Err(e) => {
                tracing::error!(error = %e, path = %version_dir.display(), "Local save failed, rolling back");
                if let Err(cleanup) = remove_dir_if_present(&version_dir).await {
                    tracing::warn!(error = %cleanup, "Rollback of partial version directory failed");
                }
                Err(e)
            }
        }
    }

    /// Read every file of a stored version.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `storage_path` has no `source/` tree.
    #[tracing::instrument(skip(self), fields(path = %storage_path.display()))]
    pub async fn read(&self, storage_path: &Path) -> GenvaultResult<FileSet> {
        read_tree(storage_path).await
    }

    /// Read one file of a stored version.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` for escaping paths and `NotFound` if the file is
    /// absent.
    #[tracing::instrument(skip(self), fields(path = %storage_path.display()))]
    pub async fn read_file(
        &self,
        storage_path: &Path,
        relative_path: &str,
    ) -> GenvaultResult<Vec<u8>> {
        let relative = layout::sanitize_relative(relative_path)?;
        let path = storage_path.join(SOURCE_DIR).join(relative);
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(relative_path.to_string())).into()
            } else {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
                .into()
            }
        })
    }

    /// Read the manifest of a stored version.
    pub async fn read_manifest(&self, storage_path: &Path) -> GenvaultResult<Manifest> {
        ManifestCodec::read(storage_path).await
    }

    /// Diff two stored versions. See [`diff_versions`](crate::diff_versions).
    pub async fn diff(&self, from_path: &Path, to_path: &Path) -> GenvaultResult<crate::VersionDiff> {
        crate::diff_versions(from_path, to_path).await
    }

    /// Persist the diff against the previous version at the version root.
    ///
    /// Returns the path of the diff artifact.
    #[tracing::instrument(skip(self, diff_text), fields(path = %storage_path.display(), bytes = diff_text.len()))]
    pub async fn write_diff(&self, storage_path: &Path, diff_text: &str) -> GenvaultResult<PathBuf> {
        let path = storage_path.join(DIFF_FILE);
        let temp_path = path.with_extension("diff.tmp");
        tokio::fs::write(&temp_path, diff_text.as_bytes())
            .await
            .map_err(|e| write_failure(&temp_path, e))?;
        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| write_failure(&path, e))?;
        Ok(path)
    }

    /// Remove a version directory recursively. Missing paths are not an error.
    #[tracing::instrument(skip(self), fields(path = %storage_path.display()))]
    pub async fn delete(&self, storage_path: &Path) -> GenvaultResult<()> {
        remove_dir_if_present(storage_path).await?;
        tracing::info!("Deleted local version directory");
        Ok(())
    }

    /// Versions materialized on disk for a project, ordered by version.
    pub async fn list_versions(
        &self,
        project_id: ProjectId,
    ) -> GenvaultResult<Vec<(u32, GenerationId)>> {
        let dir = self.generations_dir(project_id);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    dir.display(),
                    e
                )))
                .into());
            }
        };

        let mut versions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::FileRead(e.to_string())))?
        {
            if let Some(parsed) = entry
                .file_name()
                .to_str()
                .and_then(layout::parse_version_dir_name)
            {
                versions.push(parsed);
            }
        }
        versions.sort();
        Ok(versions)
    }
}

/// A validated file ready to be written.
struct PlannedFile {
    key: String,
    relative: PathBuf,
    bytes: Vec<u8>,
}

fn plan_writes(files: &FileSet) -> Result<Vec<PlannedFile>, StorageError> {
    let mut planned: BTreeMap<String, PlannedFile> = BTreeMap::new();
    for (path, bytes) in files {
        let relative = layout::sanitize_relative(path)?;
        let key = layout::to_key(&relative);
        if planned.contains_key(&key) {
            return Err(StorageError::new(StorageErrorKind::InvalidPath(format!(
                "{} collides with another path after normalization",
                path
            ))));
        }
        planned.insert(
            key.clone(),
            PlannedFile {
                key,
                relative,
                bytes: bytes.clone(),
            },
        );
    }
    Ok(planned.into_values().collect())
}

/// Write files and manifest with blocking I/O, checking `cancelled`
/// before each file and before the manifest.
fn write_version(
    version_dir: &Path,
    key: &GenerationKey,
    planned: &[PlannedFile],
    annotations: &VersionAnnotations,
    cancelled: &AtomicBool,
) -> GenvaultResult<Manifest> {
    let source = version_dir.join(SOURCE_DIR);
    std::fs::create_dir_all(&source).map_err(|e| write_failure(&source, e))?;

    let mut entries = Vec::with_capacity(planned.len());
    for file in planned {
        if cancelled.load(Ordering::SeqCst) {
            return Err(write_cancelled(version_dir));
        }
        let path = source.join(&file.relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_failure(parent, e))?;
        }
        std::fs::write(&path, &file.bytes).map_err(|e| write_failure(&path, e))?;

        entries.push(ManifestEntry {
            path: file.key.clone(),
            size: file.bytes.len() as u64,
            sha256: Some(content_hash(&file.bytes)),
        });
    }

    if cancelled.load(Ordering::SeqCst) {
        return Err(write_cancelled(version_dir));
    }
    let manifest = Manifest::new(key.project_id, key.generation_id, key.version, entries)
        .with_prompt(annotations.prompt.clone())
        .with_parent(annotations.parent_generation_id);

    let path = ManifestCodec::path(version_dir);
    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, ManifestCodec::encode(&manifest)?)
        .map_err(|e| write_failure(&temp_path, e))?;
    std::fs::rename(&temp_path, &path).map_err(|e| write_failure(&path, e))?;
    Ok(manifest)
}

fn write_cancelled(version_dir: &Path) -> GenvaultError {
    StorageError::new(StorageErrorKind::WriteFailure(format!(
        "{}: write cancelled",
        version_dir.display()
    )))
    .into()
}

fn join_failure(e: tokio::task::JoinError) -> GenvaultError {
    StorageError::new(StorageErrorKind::WriteFailure(format!(
        "task join error: {e}"
    )))
    .into()
}

/// Hex SHA-256 of `data`.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn write_failure(path: &Path, e: std::io::Error) -> GenvaultError {
    StorageError::new(StorageErrorKind::WriteFailure(format!(
        "{}: {}",
        path.display(),
        e
    )))
    .into()
}

async fn remove_dir_if_present(path: &Path) -> GenvaultResult<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::new(StorageErrorKind::WriteFailure(format!(
            "delete {}: {}",
            path.display(),
            e
        )))
        .into()),
    }
}

/// Read the `source/` tree under `version_dir` into memory.
///
/// # Errors
///
/// Returns `NotFound` when the tree is missing.
pub async fn read_tree(version_dir: &Path) -> GenvaultResult<FileSet> {
    let source = version_dir.join(SOURCE_DIR);
    tokio::task::spawn_blocking(move || read_tree_blocking(&source))
        .await
        .map_err(|e| {
            GenvaultError::from(StorageError::new(StorageErrorKind::FileRead(format!(
                "task join error: {e}"
            ))))
        })?
}

fn read_tree_blocking(source: &Path) -> GenvaultResult<FileSet> {
    if !source.is_dir() {
        return Err(StorageError::new(StorageErrorKind::NotFound(
            source.display().to_string(),
        ))
        .into());
    }

    let mut files = FileSet::new();
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(|e| StorageError::new(StorageErrorKind::FileRead(e.to_string())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| StorageError::new(StorageErrorKind::FileRead(e.to_string())))?;
        let bytes = std::fs::read(entry.path()).map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                entry.path().display(),
                e
            )))
        })?;
        files.insert(layout::to_key(relative), bytes);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_rejects_normalized_collisions() {
        let mut files = FileSet::new();
        files.insert("a.py".to_string(), b"1".to_vec());
        files.insert("./a.py".to_string(), b"2".to_vec());
        assert!(plan_writes(&files).is_err());
    }

    #[test]
    fn content_hash_is_hex_sha256() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
